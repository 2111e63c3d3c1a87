use std::fs;
use std::path::Path;

use site_publisher_core::hierarchy::{
    build_hierarchy, render_hierarchy, FileNode, HierarchyOptions, NodeKind,
};
use site_publisher_core::PublishError;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn find<'a>(node: &'a FileNode, name: &str) -> Option<&'a FileNode> {
    node.children().iter().find(|c| c.name == name)
}

fn assert_only_top_is_root(node: &FileNode, top: bool) {
    assert_eq!(node.is_root, top, "is_root wrong for {}", node.name);
    for child in node.children() {
        assert_only_top_is_root(child, false);
    }
}

/// Builds: a.aspx, b.txt, sub/c.aspx, sub/deep/d.txt, empty/
fn sample_tree(root: &Path) {
    write(root, "a.aspx", "a");
    write(root, "b.txt", "b");
    write(root, "sub/c.aspx", "c");
    write(root, "sub/deep/d.txt", "d");
    fs::create_dir_all(root.join("empty")).unwrap();
}

#[test]
fn recursive_build_counts_every_reachable_file() {
    let dir = tempdir().unwrap();
    sample_tree(dir.path());

    let node = build_hierarchy(dir.path(), &HierarchyOptions::default(), true).unwrap();

    assert!(node.is_directory());
    assert_eq!(node.file_count(), 4);
    // root + a.aspx + b.txt + sub + c.aspx + deep + d.txt + empty
    assert_eq!(node.node_count(), 8);
    assert_only_top_is_root(&node, true);

    let sub = find(&node, "sub").expect("sub present");
    assert!(sub.is_directory());
    assert!(find(sub, "deep").unwrap().has_children());
    let empty = find(&node, "empty").expect("empty dir present");
    assert_eq!(empty.kind, NodeKind::Directory(vec![]));
}

#[test]
fn non_recursive_build_keeps_only_direct_children() {
    let dir = tempdir().unwrap();
    sample_tree(dir.path());

    let options = HierarchyOptions::new(false, "*").unwrap();
    let node = build_hierarchy(dir.path(), &options, true).unwrap();

    assert_eq!(node.children().len(), 4);
    assert_eq!(node.file_count(), 2);
    let sub = find(&node, "sub").unwrap();
    assert!(sub.is_directory());
    assert!(!sub.has_children(), "no grandchildren without recursion");
    assert_eq!(sub.full_path, dir.path().join("sub"));
    assert_only_top_is_root(&node, true);
}

#[test]
fn filter_keeps_matching_files_and_all_directories() {
    let dir = tempdir().unwrap();
    sample_tree(dir.path());

    let options = HierarchyOptions::new(true, "*.aspx").unwrap();
    let node = build_hierarchy(dir.path(), &options, true).unwrap();

    assert!(find(&node, "a.aspx").is_some());
    assert!(find(&node, "b.txt").is_none());
    let sub = find(&node, "sub").unwrap();
    assert!(find(sub, "c.aspx").is_some());
    assert_eq!(node.file_count(), 2);
}

#[test]
fn file_path_builds_a_leaf() {
    let dir = tempdir().unwrap();
    write(dir.path(), "index.html", "<html/>");

    let node = build_hierarchy(dir.path().join("index.html"), &HierarchyOptions::default(), true)
        .unwrap();

    assert_eq!(node.name, "index.html");
    assert!(!node.is_directory());
    assert!(node.is_root);
    assert!(!node.has_children());
}

#[test]
fn missing_path_is_a_path_access_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let err = build_hierarchy(&missing, &HierarchyOptions::default(), true).unwrap_err();
    match err {
        PublishError::PathAccess { path, .. } => assert_eq!(path, missing),
        other => panic!("expected PathAccess, got {other:?}"),
    }
}

#[test]
fn render_has_one_line_per_node_and_is_repeatable() {
    let dir = tempdir().unwrap();
    sample_tree(dir.path());
    let node = build_hierarchy(dir.path(), &HierarchyOptions::default(), true).unwrap();

    let first: Vec<String> = render_hierarchy(&node).collect();
    let second: Vec<String> = render_hierarchy(&node).collect();

    assert_eq!(first.len(), node.node_count());
    assert_eq!(first, second);
    assert_eq!(first[0], node.name);
    assert!(first[1..].iter().all(|l| l.contains("├-") || l.contains("└-")));
    assert_eq!(first.iter().filter(|l| l.starts_with("└-")).count(), 1);
}

#[cfg(unix)]
mod symlinks {
    use super::*;
    use std::os::unix::fs::symlink;

    #[test]
    fn dangling_link_excluded_by_filter_is_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "home.aspx", "h");
        symlink(dir.path().join("gone.txt"), dir.path().join("stale.txt")).unwrap();

        let options = HierarchyOptions::new(true, "*.aspx").unwrap();
        let node = build_hierarchy(dir.path(), &options, true).expect("filtered link ignored");

        assert_eq!(node.file_count(), 1);
        assert!(find(&node, "stale.txt").is_none());
    }

    #[test]
    fn dangling_link_matching_filter_is_an_error() {
        let dir = tempdir().unwrap();
        symlink(dir.path().join("gone.txt"), dir.path().join("stale.txt")).unwrap();

        let err = build_hierarchy(dir.path(), &HierarchyOptions::default(), true).unwrap_err();
        match err {
            PublishError::PathAccess { path, .. } => assert_eq!(path, dir.path().join("stale.txt")),
            other => panic!("expected PathAccess, got {other:?}"),
        }
    }

    #[test]
    fn link_to_ancestor_is_reported_at_first_occurrence() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sub/page.aspx", "p");
        symlink(dir.path(), dir.path().join("sub/loop")).unwrap();

        let err = build_hierarchy(dir.path(), &HierarchyOptions::default(), true).unwrap_err();
        match err {
            PublishError::PathAccess { path, .. } => {
                assert_eq!(path, dir.path().join("sub/loop"))
            }
            other => panic!("expected PathAccess, got {other:?}"),
        }
    }

    #[test]
    fn non_recursive_build_does_not_follow_into_link_cycles() {
        let dir = tempdir().unwrap();
        symlink(dir.path(), dir.path().join("loop")).unwrap();

        let options = HierarchyOptions::new(false, "*").unwrap();
        let node = build_hierarchy(dir.path(), &options, true).unwrap();

        let link = find(&node, "loop").expect("link listed");
        assert!(link.is_directory());
        assert!(!link.has_children());
    }
}
