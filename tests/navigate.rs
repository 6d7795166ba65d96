mod common;

use lectern::Document;
use std::fs;

#[test]
fn cursor_starts_at_first_entry() {
    let doc = Document::open(common::FIXTURE_DIR).unwrap();

    assert_eq!(0, doc.current_index());
    assert_eq!(Some("c1"), doc.current_id());

    let expected = fs::read(format!("{}/OEBPS/chap1.html", common::FIXTURE_DIR)).unwrap();
    assert_eq!(Some(expected), doc.current());
}

#[test]
fn cursor_saturates_at_both_ends() {
    let mut doc = Document::open(common::FIXTURE_DIR).unwrap();
    let len = doc.spine().len();

    // Retreating from the first entry is a no-op
    assert!(!doc.go_prev());
    assert_eq!(0, doc.current_index());

    // Advancing len - 1 times reaches the last entry
    for _ in 1..len {
        assert!(doc.go_next());
    }
    assert_eq!(len - 1, doc.current_index());
    assert_eq!(Some("c3"), doc.current_id());

    // One further advance is a no-op
    assert!(!doc.go_next());
    assert_eq!(len - 1, doc.current_index());

    assert!(doc.go_prev());
    assert_eq!(Some("c2"), doc.current_id());
}

#[test]
fn single_entry_spine_never_moves() {
    let zipped = common::container_with_package(
        r#"<package>
          <manifest>
            <item id="c1" href="chap1.html" media-type="text/html"/>
          </manifest>
          <spine><itemref idref="c1"/></spine>
        </package>"#,
    );
    let mut doc = Document::from_reader(zipped).unwrap();

    assert!(!doc.go_next());
    assert!(!doc.go_prev());
    assert_eq!(0, doc.current_index());
    assert_eq!(
        Some(b"<html><body><p>First chapter.</p></body></html>".to_vec()),
        doc.current(),
    );
}

#[test]
fn repeated_spine_entries_are_kept() {
    let zipped = common::container_with_package(
        r#"<package>
          <manifest>
            <item id="c1" href="chap1.html" media-type="text/html"/>
          </manifest>
          <spine>
            <itemref idref="c1"/>
            <itemref idref="c1"/>
          </spine>
        </package>"#,
    );
    let mut doc = Document::from_reader(zipped).unwrap();

    assert_eq!(doc.spine(), ["c1", "c1"]);
    assert!(doc.go_next());
    assert_eq!(1, doc.current_index());
    assert_eq!(Some("c1"), doc.current_id());
}

#[test]
fn dangling_spine_reference_surfaces_lazily() {
    // "ghost" has no manifest counterpart; construction still succeeds
    let zipped = common::container_with_package(
        r#"<package>
          <manifest>
            <item id="c1" href="chap1.html" media-type="text/html"/>
          </manifest>
          <spine>
            <itemref idref="c1"/>
            <itemref idref="ghost"/>
          </spine>
        </package>"#,
    );
    let mut doc = Document::from_reader(zipped).unwrap();

    assert!(doc.current().is_some());
    assert!(doc.go_next());
    assert_eq!(Some("ghost"), doc.current_id());
    assert_eq!(None, doc.current());
    assert_eq!(None, doc.text());
}

#[test]
fn empty_spine_navigation_is_inert() {
    let zipped = common::container_with_package(
        r#"<package>
          <manifest>
            <item id="c1" href="chap1.html" media-type="text/html"/>
          </manifest>
          <spine/>
        </package>"#,
    );
    let mut doc = Document::from_reader(zipped).unwrap();

    assert!(!doc.go_next());
    assert!(!doc.go_prev());
    assert_eq!(None, doc.current_id());
    assert_eq!(None, doc.current());
    assert_eq!(None, doc.text());
}
