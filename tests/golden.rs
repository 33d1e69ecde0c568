//! The vendored 1EdTech complete example credential must pass structural
//! validation with every optional and extension field intact.

use serde_json::Value;

use openbadges::credential::Credential;
use openbadges::schema;

fn golden() -> Value {
    serde_json::from_str(include_str!("ob3-example-credential.json")).unwrap()
}

#[test]
fn golden_credential_validates() {
    let report = schema::validate(&golden());
    assert!(report.valid, "unexpected errors: {:?}", report.errors);
}

#[test]
fn golden_credential_validates_without_jwt_claims() {
    let mut credential = golden();
    let root = credential.as_object_mut().unwrap();
    for claim in &["iss", "jti", "sub", "nbf", "exp"] {
        root.remove(*claim);
    }
    let report = schema::validate(&credential);
    assert!(report.valid, "unexpected errors: {:?}", report.errors);
    schema::assert_valid(&credential).unwrap();
}

#[test]
fn golden_credential_round_trips_through_typed_model() {
    let credential: Credential = serde_json::from_value(golden()).unwrap();
    assert_eq!(credential.id, "http://1edtech.edu/credentials/3732");
    assert_eq!(credential.issuer.name.as_deref(), Some("1EdTech University"));

    let reserialized = credential.to_json().unwrap();
    // open-world fields survive the typed round trip
    assert_eq!(reserialized["credentialSubject"]["licenseNumber"], "A-9320041");
    assert_eq!(
        reserialized["credentialSubject"]["achievement"]["resultDescription"][0]["allowedValue"][3],
        "A"
    );
    assert_eq!(reserialized["iss"], "https://1edtech.edu/issuers/565049");
    assert!(schema::validate(&reserialized).valid);
}

#[test]
fn golden_credential_mutations_are_caught() {
    let mut credential = golden();
    credential["credentialSubject"]["achievement"]
        .as_object_mut()
        .unwrap()
        .remove("name");
    let report = schema::validate(&credential);
    assert!(!report.valid);
    assert!(report
        .errors
        .iter()
        .any(|e| e.path == "credentialSubject.achievement.name"));
}
