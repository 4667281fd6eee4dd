//! Wildcard matching for IAM actions and ARNs
//!
//! `*` stands for zero or more characters of any kind, including `:` and `/`.
//! Either operand may contain wildcards: a stored ARN such as
//! `arn:aws:ec2:*:*:instance/i-123` is compared against a query pattern such as
//! `arn:aws:ec2:us-east-1:*`, and the two are compatible when some concrete
//! string is matched by both.
//!
//! The scan walks both strings with a pair of forward-only cursors and keeps,
//! for the current position in the left operand, the set of positions the right
//! cursor can be at. Every (left, right) cursor pair is visited at most once, so
//! adversarial wildcard placement costs `O(len(a) * len(b))` and never explodes.

/// A single unit of a pattern after wildcard runs are collapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Any,
    Literal(char),
}

impl Token {
    fn is_any(self) -> bool {
        matches!(self, Token::Any)
    }
}

/// Split a pattern into tokens, collapsing `**`, `***`, ... into one `Any`
fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' {
            if tokens.last() != Some(&Token::Any) {
                tokens.push(Token::Any);
            }
        } else {
            tokens.push(Token::Literal(c));
        }
    }
    tokens
}

/// Treat every character as a literal, including `*`
fn literal(value: &str) -> Vec<Token> {
    value.chars().map(Token::Literal).collect()
}

/// Pattern matcher for IAM action and resource identifiers
pub struct PatternMatcher;

impl PatternMatcher {
    /// Symmetric match: true iff some string is matched by both `a` and `b`
    ///
    /// # Examples
    /// ```
    /// use iam_snitch::PatternMatcher;
    ///
    /// assert!(PatternMatcher::matches("arn:aws:s3:::bucket/*", "arn:aws:s3:::*/key"));
    /// assert!(PatternMatcher::matches("ec2:Describe*", "*Instances"));
    /// assert!(!PatternMatcher::matches("s3:Get*", "s3:Put*"));
    /// ```
    pub fn matches(a: &str, b: &str) -> bool {
        if a == b || a == "*" || b == "*" {
            return true;
        }
        if !a.contains('*') && !b.contains('*') {
            return false;
        }

        Self::intersects(&tokenize(a), &tokenize(b))
    }

    /// One-sided glob: `pattern` may contain wildcards, `value` is taken literally
    ///
    /// # Examples
    /// ```
    /// use iam_snitch::PatternMatcher;
    ///
    /// assert!(PatternMatcher::glob("ec2:Create*", "ec2:CreateInstance"));
    /// assert!(!PatternMatcher::glob("ec2:Create*", "*"));
    /// ```
    pub fn glob(pattern: &str, value: &str) -> bool {
        if !pattern.contains('*') {
            return pattern == value;
        }

        Self::intersects(&tokenize(pattern), &literal(value))
    }

    /// Exact comparison, `*` has no special meaning
    pub fn exact(pattern: &str, value: &str) -> bool {
        pattern == value
    }

    /// Two-cursor scan over token streams
    ///
    /// `row[j]` is true when cursor pair `(i, j)` is reachable. From a reachable
    /// pair:
    /// - equal literals advance both cursors
    /// - a wildcard in `a` may end (advance `i`) or absorb `b[j]` (advance `j`)
    /// - a wildcard in `b` may end (advance `j`) or absorb `a[i]` (advance `i`)
    ///
    /// Two wildcards facing each other never need to absorb common text: any
    /// witness they share can be dropped, so ending either one is enough.
    fn intersects(a: &[Token], b: &[Token]) -> bool {
        let m = b.len();
        let mut row = vec![false; m + 1];
        row[0] = true;

        for i in 0..=a.len() {
            let left = a.get(i).copied();

            // Moves within row i: advance j only
            for j in 0..m {
                if row[j] && (b[j].is_any() || left.map_or(false, Token::is_any)) {
                    row[j + 1] = true;
                }
            }

            let Some(left) = left else {
                break;
            };

            // Moves into row i + 1
            let mut next = vec![false; m + 1];
            let mut alive = false;
            for j in 0..=m {
                if !row[j] {
                    continue;
                }
                let right = b.get(j).copied();
                if left.is_any() || right.map_or(false, Token::is_any) {
                    next[j] = true;
                    alive = true;
                }
                if let (Token::Literal(x), Some(Token::Literal(y))) = (left, right) {
                    if x == y {
                        next[j + 1] = true;
                        alive = true;
                    }
                }
            }

            if !alive {
                return false;
            }
            row = next;
        }

        row[m]
    }
}
