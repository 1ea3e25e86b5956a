use std::sync::Arc;
use std::thread;

use asmspy_core::analysis::ReferenceIndex;
use asmspy_core::model::{AssemblyVersion, DeclaredReference, ModuleManifest};

fn manifest(refs: &[(&str, (u16, u16))]) -> ModuleManifest {
    ModuleManifest {
        assembly_name: None,
        references: refs.iter().map(|(n, v)| DeclaredReference::new(*n, (*v).into())).collect(),
    }
}

#[test]
fn records_every_reference_under_its_own_name() {
    let index = ReferenceIndex::new();
    index.record_manifest("A", &manifest(&[("Foo", (1, 0)), ("Bar", (2, 0))]));
    index.record_manifest("B", &manifest(&[("Foo", (1, 0))]));

    let snapshot = index.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["Foo"].len(), 2);
    assert_eq!(snapshot["Bar"].len(), 1);
    for (name, refs) in &snapshot {
        assert!(refs.iter().all(|r| &r.name == name));
    }
    assert_eq!(index.reference_count(), 3);
}

#[test]
fn empty_manifest_adds_no_keys() {
    let index = ReferenceIndex::new();
    index.record_manifest("A", &ModuleManifest::default());
    assert!(index.is_empty());
}

#[test]
fn snapshot_sorts_by_version_then_referencer() {
    let index = ReferenceIndex::new();
    index.record_manifest("Zed", &manifest(&[("Foo", (2, 0))]));
    index.record_manifest("Beta", &manifest(&[("Foo", (1, 0))]));
    index.record_manifest("Alpha", &manifest(&[("Foo", (2, 0))]));

    let refs = &index.snapshot()["Foo"];
    let order: Vec<(AssemblyVersion, &str)> =
        refs.iter().map(|r| (r.version, r.referenced_by.as_str())).collect();
    assert_eq!(
        order,
        vec![
            (AssemblyVersion::from((1, 0)), "Beta"),
            (AssemblyVersion::from((2, 0)), "Alpha"),
            (AssemblyVersion::from((2, 0)), "Zed"),
        ]
    );
}

#[test]
fn concurrent_writers_lose_nothing_and_share_one_list_per_name() {
    let index = Arc::new(ReferenceIndex::new());
    let workers: Vec<_> = (0..8)
        .map(|w| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for i in 0..50u16 {
                    let m = manifest(&[("Shared", (1, i % 3)), ("Other", (2, 0))]);
                    index.record_manifest(&format!("worker{w}-{i}"), &m);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let snapshot = index.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["Shared"].len(), 400);
    assert_eq!(snapshot["Other"].len(), 400);
}
