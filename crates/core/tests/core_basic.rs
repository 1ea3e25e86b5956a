use asmspy_core::model::AssemblyVersion;
use asmspy_core::version;

#[test]
fn version_is_non_empty() {
    let v = version();
    assert!(!v.is_empty());
}

#[test]
fn assembly_version_displays_all_four_parts() {
    assert_eq!(AssemblyVersion::new(4, 0, 30319, 1).to_string(), "4.0.30319.1");
    assert_eq!(AssemblyVersion::from((1, 0)).to_string(), "1.0.0.0");
}

#[test]
fn assembly_version_parses_short_and_full_forms() {
    assert_eq!("2.1".parse::<AssemblyVersion>().unwrap(), AssemblyVersion::new(2, 1, 0, 0));
    assert_eq!("2.1.3.4".parse::<AssemblyVersion>().unwrap(), AssemblyVersion::new(2, 1, 3, 4));
    assert!("2".parse::<AssemblyVersion>().is_err());
    assert!("1.2.3.4.5".parse::<AssemblyVersion>().is_err());
    assert!("1.x".parse::<AssemblyVersion>().is_err());
    assert!("1.70000".parse::<AssemblyVersion>().is_err());
}

#[test]
fn assembly_version_orders_numerically_not_lexically() {
    let v9 = AssemblyVersion::new(1, 9, 0, 0);
    let v10 = AssemblyVersion::new(1, 10, 0, 0);
    assert!(v9 < v10);
    assert!(AssemblyVersion::new(1, 10, 0, 0) < AssemblyVersion::new(2, 0, 0, 0));
    assert!(AssemblyVersion::new(1, 0, 0, 1) > AssemblyVersion::new(1, 0, 0, 0));
}

#[test]
fn assembly_version_serializes_as_string() {
    let json = serde_json::to_string(&AssemblyVersion::new(1, 2, 3, 4)).unwrap();
    assert_eq!(json, "\"1.2.3.4\"");
    let back: AssemblyVersion = serde_json::from_str(&json).unwrap();
    assert_eq!(back, AssemblyVersion::new(1, 2, 3, 4));
}
