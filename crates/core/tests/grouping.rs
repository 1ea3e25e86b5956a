use asmspy_core::analysis::{group_indices, DEFAULT_PALETTE_SIZE};
use asmspy_core::model::{AssemblyResult, AssemblyVersion, ReferenceEntry};

fn result_with_versions(count: u16) -> AssemblyResult {
    let versions: Vec<AssemblyVersion> = (0..count).map(|i| AssemblyVersion::from((1, i))).collect();
    let references = versions
        .iter()
        .flat_map(|v| {
            ["A", "B"].into_iter().map(move |by| ReferenceEntry { version: *v, referenced_by: by.into() })
        })
        .collect();
    AssemblyResult { assembly_name: "Foo".into(), versions, references }
}

#[test]
fn group_index_is_position_in_version_list() {
    let result = result_with_versions(3);
    for (i, v) in result.versions.iter().enumerate() {
        assert_eq!(result.group_index(v), Some(i));
    }
    assert_eq!(result.group_index(&AssemblyVersion::from((9, 9))), None);
}

#[test]
fn equal_versions_share_a_group_and_distinct_versions_differ() {
    let result = result_with_versions(DEFAULT_PALETTE_SIZE as u16);
    let groups = group_indices(&result, DEFAULT_PALETTE_SIZE);
    for a in &result.references {
        for b in &result.references {
            let same = groups[&a.version] == groups[&b.version];
            assert_eq!(same, a.version == b.version);
        }
    }
}

#[test]
fn groups_wrap_past_palette_size() {
    let result = result_with_versions(8);
    let groups = result.group_indices(DEFAULT_PALETTE_SIZE);
    assert_eq!(groups.len(), 8);
    assert_eq!(groups[&AssemblyVersion::from((1, 6))], 0);
    assert_eq!(groups[&AssemblyVersion::from((1, 7))], 1);
    assert!(groups.values().all(|g| *g < DEFAULT_PALETTE_SIZE));
}

#[test]
fn grouping_is_pure() {
    let result = result_with_versions(4);
    assert_eq!(group_indices(&result, 6), group_indices(&result, 6));
    assert!(group_indices(&result, 0).values().all(|g| *g == 0));
}
