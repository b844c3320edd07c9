//! Parser tests over realistic module fragments
//!
//! Snapshots are inline; review changes with: cargo insta review

use modkit_syntax::ast::*;
use modkit_syntax::visit::{collect_attributes, top_level_classes, top_level_functions};
use modkit_syntax::{error_codes, parse, parse_file};
use pretty_assertions::assert_eq;
use rstest::rstest;

const PUBLIC_FUNCTION: &str = r#"
function Get-Widget {
    <#
    .SYNOPSIS
        Gets widgets.
    #>
    [CmdletBinding(DefaultParameterSetName = 'ByName')]
    [OutputType([pscustomobject])]
    param(
        [Parameter(Mandatory, ParameterSetName = 'ByName', ValueFromPipeline = $true)]
        [ValidateNotNullOrEmpty()]
        [string[]]
        $Name,

        [switch] $Force
    )

    process {
        foreach ($n in $Name) {
            $result = @{
                Name = $n
                Time = (Get-Date).ToString('o')
            }
            [pscustomobject]$result | Write-Output
        }
    }
}
"#;

#[test]
fn test_public_function_fragment() {
    let (script, diagnostics) = parse(PUBLIC_FUNCTION);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let functions = top_level_functions(&script);
    assert_eq!(functions.len(), 1);
    let function = functions[0];
    assert_eq!(function.name, "Get-Widget");

    let params: Vec<_> = function.all_params().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["Name", "Force"]);

    let attributes: Vec<_> = collect_attributes(&script)
        .iter()
        .map(|a| a.name.name.clone())
        .collect();
    insta::assert_debug_snapshot!(attributes, @r#"
    [
        "CmdletBinding",
        "OutputType",
        "Parameter",
        "ValidateNotNullOrEmpty",
    ]
    "#);
}

#[test]
fn test_class_fragment_with_dsc_resource() {
    let source = r#"
enum Ensure {
    Absent
    Present
}

[DscResource()]
class ServiceConfig {
    [DscProperty(Key)]
    [string] $Name

    [DscProperty()]
    [Ensure] $Ensure = [Ensure]::Present

    [ServiceConfig] Get() {
        return $this
    }

    [bool] Test() { return $true }

    [void] Set() { }
}

class Helper { }
"#;
    let (script, diagnostics) = parse(source);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let classes = top_level_classes(&script);
    let dsc: Vec<_> = classes
        .iter()
        .filter(|c| c.has_attribute("DscResource"))
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(dsc, vec!["ServiceConfig"]);
    assert_eq!(classes[0].members.len(), 5);
}

#[test]
fn test_script_with_using_and_dot_source() {
    let source = "using module .\\Other.psm1\nusing namespace System.Text\n. $PSScriptRoot\\helpers.ps1\n$script:cache = @{}\n";
    let (script, diagnostics) = parse(source);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert!(matches!(&script.items[0], Item::Using(u) if u.kind == UsingKind::Module));
    assert!(matches!(&script.items[1], Item::Using(u) if u.kind == UsingKind::Namespace));
    assert_eq!(script.items.len(), 4);
}

#[rstest]
#[case::function_missing_name("function {\n}", error_codes::MISSING_FUNCTION_NAME)]
#[case::function_missing_body("function Get-Thing\n", error_codes::MISSING_FUNCTION_BODY)]
#[case::unterminated_string("Write-Host 'oops\n", error_codes::UNTERMINATED_STRING)]
#[case::unterminated_here_string("$x = @\"\nbody\n", error_codes::UNTERMINATED_HERE_STRING)]
#[case::unterminated_comment("<# no end", error_codes::UNTERMINATED_COMMENT)]
#[case::unterminated_variable("${name", error_codes::UNTERMINATED_VARIABLE)]
#[case::missing_paren("Get-Item (1 + 2\n", error_codes::MISSING_CLOSING_DELIMITER)]
#[case::class_missing_name("class {\n}", error_codes::MISSING_TYPE_NAME)]
#[case::enum_bad_member("enum E { 1 }", error_codes::INVALID_ENUM_MEMBER)]
#[case::using_bad_kind("using something X", error_codes::INVALID_USING)]
#[case::hashtable_missing_equals("@{ A 1 }", error_codes::MISSING_HASH_EQUALS)]
#[case::stray_closer(")", error_codes::UNEXPECTED_TOKEN)]
fn test_syntax_errors(#[case] source: &str, #[case] code: &str) {
    let (_, diagnostics) = parse(source);
    assert!(
        diagnostics.iter().any(|d| d.code == code),
        "expected {} for {:?}, got {:?}",
        code,
        source,
        diagnostics
    );
}

#[test]
fn test_diagnostic_position_and_snippet() {
    let source = "function Get-A {\n    Write-Host 'broken\n}\n";
    let (_, diagnostics) = parse_file("Public/Get-A.ps1", source);
    let diag = diagnostics
        .iter()
        .find(|d| d.code == error_codes::UNTERMINATED_STRING)
        .expect("unterminated string diagnostic");
    assert_eq!(diag.file, "Public/Get-A.ps1");
    assert_eq!(diag.line, 2);
    assert_eq!(diag.column, 16);
    assert_eq!(diag.snippet, "    Write-Host 'broken");
}

#[test]
fn test_multiple_errors_are_all_reported() {
    let source = "function {\n}\nclass {\n}\nfunction Get-Ok { }\n";
    let (script, diagnostics) = parse(source);
    assert_eq!(diagnostics.len(), 2, "{:?}", diagnostics);
    assert_eq!(top_level_functions(&script)[0].name, "Get-Ok");
}
