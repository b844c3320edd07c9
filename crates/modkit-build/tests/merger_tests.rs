//! Module merge tests

use modkit_build::merger::merge_items;
use modkit_build::{Category, SourceItem};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn create_test_project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (path, content) in files {
        let full = temp.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    temp
}

fn item(temp: &TempDir, path: &str, category: Category) -> SourceItem {
    SourceItem::new(temp.path().join(path), category)
}

#[test]
fn test_imports_hoisted_once_and_sorted() {
    let temp = create_test_project(&[
        ("Private/P.ps1", "function P { }\n"),
        (
            "Public/A.ps1",
            "using module Helpers\nfunction A {\n    'a'   \n}\n",
        ),
        (
            "Public/B.ps1",
            "  using module Helpers  \nusing assembly System.Web\n\nfunction B { 'b' }\n",
        ),
    ]);
    let items = vec![
        item(&temp, "Private/P.ps1", Category::Private),
        item(&temp, "Public/A.ps1", Category::Public),
        item(&temp, "Public/B.ps1", Category::Public),
    ];

    let unit = merge_items(&items, "\n").unwrap();
    assert_eq!(
        unit.imports,
        vec!["using assembly System.Web", "using module Helpers"]
    );
    assert_eq!(
        unit.render(),
        "using assembly System.Web\nusing module Helpers\n\nfunction P { }\nfunction A {\n    'a'\n}\nfunction B { 'b' }\n"
    );
}

#[test]
fn test_merge_is_independent_of_input_order() {
    let temp = create_test_project(&[
        ("Enums/Color.ps1", "enum Color {\n    Red\n}\n"),
        ("Public/Get-Widget.ps1", "function Get-Widget {}\n"),
        ("Private/Helper.ps1", "function Helper {}\n"),
    ]);
    let forward = vec![
        item(&temp, "Enums/Color.ps1", Category::Enum),
        item(&temp, "Private/Helper.ps1", Category::Private),
        item(&temp, "Public/Get-Widget.ps1", Category::Public),
    ];
    let mut reversed = forward.clone();
    reversed.reverse();

    let first = merge_items(&forward, "\n").unwrap().render();
    let second = merge_items(&reversed, "\n").unwrap().render();
    assert_eq!(first, second);
    assert_eq!(merge_items(&forward, "\n").unwrap().render(), first);
    assert!(first.starts_with("enum Color"));
}

#[test]
fn test_initialization_only() {
    let temp = create_test_project(&[(
        "InitializeModule.ps1",
        "function InitializeModule {\n    $script:Ready = $true\n}\n",
    )]);
    let items = vec![item(&temp, "InitializeModule.ps1", Category::Initialization)];

    let unit = merge_items(&items, "\n").unwrap();
    assert!(unit.has_initialization);
    assert_eq!(
        unit.render(),
        "function InitializeModule {\n    $script:Ready = $true\n}\nInitializeModule\n"
    );
}

#[test]
fn test_crlf_output() {
    let temp = create_test_project(&[("Public/A.ps1", "function A {\n    1\n}\n")]);
    let items = vec![item(&temp, "Public/A.ps1", Category::Public)];

    let unit = merge_items(&items, "\r\n").unwrap();
    assert_eq!(unit.render(), "function A {\r\n    1\r\n}\r\n");
}

#[test]
fn test_static_items_ignored() {
    let temp = create_test_project(&[
        ("Public/A.ps1", "function A {}"),
        ("README.md", "# readme"),
    ]);
    let items = vec![
        item(&temp, "Public/A.ps1", Category::Public),
        item(&temp, "README.md", Category::Static),
    ];
    assert_eq!(merge_items(&items, "\n").unwrap().render(), "function A {}\n");
}

#[test]
fn test_zero_fragments_still_written() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("build").join("Empty.psm1");

    let unit = merge_items(&[], "\n").unwrap();
    unit.write_to(&target).unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "");
}

#[test]
fn test_whitespace_only_fragment_contributes_nothing() {
    let temp = create_test_project(&[
        ("Public/Blank.ps1", "   \n\t\n"),
        ("Public/Only-Import.ps1", "using module Helpers\n"),
    ]);
    let items = vec![
        item(&temp, "Public/Blank.ps1", Category::Public),
        item(&temp, "Public/Only-Import.ps1", Category::Public),
    ];
    assert_eq!(
        merge_items(&items, "\n").unwrap().render(),
        "using module Helpers\n\n"
    );
}
