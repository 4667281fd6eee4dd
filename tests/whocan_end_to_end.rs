//! End-to-end who-can queries through the public facade

use iam_snitch::{Filter, GrantKind, SnapshotSource, Snitch, SnitchConfig};
use tempfile::TempDir;

const TRUST: &str = r#"{"Statement":[{"Effect":"Allow","Action":"sts:AssumeRole","Principal":{"AWS":"arn:aws:iam::111122223333:role/TestRole"}}]}"#;
const ADMIN: &str = r#"{"Statement":{"Effect":"Allow","Action":"*","Resource":"*"}}"#;
const CREATE: &str = r#"{"Statement":{"Effect":"Allow","Action":"ec2:CreateInstance","Resource":"arn:aws:ec2:*:*:instance/someinstanceid"}}"#;

fn source() -> SnapshotSource {
    let mut source = SnapshotSource::new();
    source
        .add_role(
            "Admin",
            "arn:aws:iam::111122223333:role/Admin",
            TRUST,
            &[("Admin", "arn:aws:iam::111122223333:policy/Admin")],
        )
        .add_role(
            "Launcher",
            "arn:aws:iam::111122223333:role/Launcher",
            TRUST,
            &[("Create", "arn:aws:iam::111122223333:policy/Create")],
        )
        .add_policy("arn:aws:iam::111122223333:policy/Admin", ADMIN)
        .add_policy("arn:aws:iam::111122223333:policy/Create", CREATE);
    source
}

fn snitch() -> Snitch {
    let mut snitch = Snitch::open_in_memory().unwrap();
    snitch.refresh(&source()).unwrap();
    snitch
}

#[test]
fn test_wildcard_permission_skips_stored_star() {
    let mut snitch = snitch();
    let rules = snitch
        .who_can(&Filter::new().permission("ec2:Create*").resource("*"))
        .unwrap();

    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].permission, "ec2:CreateInstance");
    assert_eq!(rules[0].resource, "arn:aws:ec2:*:*:instance/someinstanceid");
    assert_eq!(
        rules[0].principal.to_string(),
        "AWS[arn:aws:iam::111122223333:role/TestRole]"
    );
}

#[test]
fn test_exact_mode() {
    let mut snitch = snitch();

    let none = snitch
        .who_can(&Filter::new().permission("ec2:Create*").resource("*").exact(true))
        .unwrap();
    assert!(none.is_empty());

    let admin = snitch
        .who_can(&Filter::new().permission("*").resource("*").exact(true))
        .unwrap();
    assert_eq!(admin.len(), 1);
    assert_eq!(admin[0].permission, "*");
}

#[test]
fn test_grant_chain_explains_access() {
    let mut snitch = snitch();
    let rules = snitch
        .who_can(&Filter::new().permission("ec2:CreateInstance").resource("*"))
        .unwrap();

    let chain = rules[0].grant_chain.grants();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].kind, GrantKind::Role);
    assert_eq!(chain[0].id, "arn:aws:iam::111122223333:role/Launcher");
    assert_eq!(chain[1].kind, GrantKind::Policy);
    assert_eq!(chain[1].id, "arn:aws:iam::111122223333:policy/Create");
}

#[test]
fn test_concrete_resource_query() {
    let mut snitch = snitch();
    let rules = snitch
        .who_can(
            &Filter::new()
                .permission("ec2:CreateInstance")
                .resource("arn:aws:ec2:us-east-1:111122223333:instance/someinstanceid"),
        )
        .unwrap();

    // The launcher's scoped grant and nothing from the admin role, whose action is "*"
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].grant_chain.root().id, "arn:aws:iam::111122223333:role/Launcher");
}

#[test]
fn test_json_output_shape() {
    let mut snitch = snitch();
    let rules = snitch
        .who_can(&Filter::new().permission("ec2:CreateInstance").resource("*"))
        .unwrap();

    let json = serde_json::to_value(&rules).unwrap();
    assert_eq!(
        json[0]["principal"],
        "AWS[arn:aws:iam::111122223333:role/TestRole]"
    );
    assert_eq!(
        json[0]["grant_chain"][0],
        "Role:arn:aws:iam::111122223333:role/Launcher"
    );
}

#[test]
fn test_rules_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = SnitchConfig::default().with_database(dir.path().join("rules.db"));

    {
        let mut snitch = Snitch::open(&config).unwrap();
        snitch.refresh(&source()).unwrap();
        assert_eq!(snitch.rule_count().unwrap(), 2);
    }

    let mut snitch = Snitch::open(&config).unwrap();
    assert_eq!(snitch.rule_count().unwrap(), 2);

    let rules = snitch
        .who_can(&Filter::new().permission("*").resource("*"))
        .unwrap();
    assert_eq!(rules.len(), 2);
}
