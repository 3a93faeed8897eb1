//! End-to-end conversion tests: whole templates in, ERB text out.

use haml2erb_core::{
    convert, convert_and_validate, convert_directory, convert_file, convert_with_diagnostics,
    validate, ConvertError, ConvertOptions,
};
use std::fs;
use std::path::PathBuf;

#[test]
fn test_empty_div() {
    assert_eq!(convert("%div").unwrap(), "<div></div>\n");
}

#[test]
fn test_void_element_self_closing() {
    assert_eq!(convert("%br/").unwrap(), "<br>\n");
}

#[test]
fn test_shorthand_class_and_id() {
    assert_eq!(
        convert("%div.foo#bar").unwrap(),
        "<div class=\"foo\" id=\"bar\"></div>\n"
    );
}

#[test]
fn test_shorthand_and_hash_class_merge_once() {
    let erb = convert("%nav.page-nav{ class: \"navbar\" }").unwrap();
    assert_eq!(erb.matches("class=").count(), 1);
    assert!(erb.contains("class=\"page-nav navbar\""));
}

#[test]
fn test_boolean_attribute_forms() {
    assert_eq!(convert("%input{ disabled: true }").unwrap(), "<input disabled>\n");
    assert_eq!(convert("%input{ disabled: false }").unwrap(), "<input>\n");
    assert!(convert("%button{ \"aria-expanded\": false }")
        .unwrap()
        .contains("aria-expanded=\"false\""));
}

#[test]
fn test_dynamic_boolean_attribute() {
    assert!(convert("%input{ checked: is_checked }")
        .unwrap()
        .contains("<%= 'checked' if (is_checked) %>"));
}

#[test]
fn test_data_action_arrow_survives() {
    let erb = convert("%div{ data: { action: \"change->form#submit\" } }").unwrap();
    assert!(erb.contains("data-action=\"change->form#submit\""));
}

#[test]
fn test_if_else_structure() {
    let erb = convert("- if a\n  %p A\n- else\n  %p B").unwrap();
    let expected = [
        "<% if a %>",
        "  <p>A</p>",
        "<% else %>",
        "  <p>B</p>",
        "<% end %>",
    ];
    let mut last = 0;
    for piece in expected {
        let at = erb[last..]
            .find(piece)
            .unwrap_or_else(|| panic!("missing \"{}\" after byte {} in:\n{}", piece, last, erb));
        last += at + piece.len();
    }
}

#[test]
fn test_object_reference_expansion() {
    assert_eq!(
        convert("%tr[@item, :row]").unwrap(),
        "<tr class=\"<%= \"row_\" + @item.class.name.underscore %>\" \
         id=\"<%= \"row_\" + @item.class.name.underscore + '_' + @item.to_key.first.to_s %>\"></tr>\n"
    );
}

#[test]
fn test_interpolation_with_block_argument() {
    assert_eq!(
        convert("Total: #{items.sum { |i| i.price }}").unwrap(),
        "Total: <%= items.sum { |i| i.price } %>\n"
    );
}

#[test]
fn test_double_splat_warns_and_keeps_rest() {
    let (erb, warnings) = convert_with_diagnostics("%div{ **extra, alt: \"x\" }").unwrap();
    assert!(erb.contains("alt=\"x\""));
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("Double splat"));
}

#[test]
fn test_doctype_variants() {
    assert_eq!(
        convert("!!! XML").unwrap(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"
    );
    assert_eq!(convert("!!! Strict").unwrap(), "<!DOCTYPE html>\n");
}

#[test]
fn test_escaped_interpolation_round_trip() {
    assert_eq!(convert("%p \\#{x}").unwrap(), "<p>#{x}</p>\n");
}

#[test]
fn test_unclosed_interpolation_is_hard_error() {
    assert!(matches!(
        convert("%p broken #{oops"),
        Err(ConvertError::UnclosedInterpolation)
    ));
}

#[test]
fn test_syntax_error_carries_line() {
    let err = convert("%ul\n   %li bad indent").unwrap_err();
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_every_line_indents_in_two_space_units() {
    let erb = convert(
        "%section\n  %ul\n    - items.each do |item|\n      %li= item\n  %footer\n    fin",
    )
    .unwrap();
    for line in erb.lines() {
        let spaces = line.len() - line.trim_start_matches(' ').len();
        assert_eq!(spaces % 2, 0, "odd indent in line: {:?}", line);
    }
}

#[test]
fn test_realistic_page_produces_valid_erb() {
    let haml = r#"!!!
%html
  %head
    %title= page_title
    :css
      body { margin: 0; }
  %body
    %nav.page-nav{ class: "navbar", data: { controller: "nav" } }
      %ul
        - sections.each do |section|
          %li{ class: section_class(section) }
            %a{ href: section_path(section) }= section.name
    - if current_user
      %p.greeting Hello #{current_user.name}!
    - else
      %p.greeting
        Please
        %a{ href: login_path } log in
    %footer
      %img{ src: "/logo.png", alt: "Logo" }
"#;
    let report = convert_and_validate(haml).unwrap();
    assert!(
        report.is_success(),
        "validator reported: {:?}\nin:\n{}",
        report.errors,
        report.erb
    );
    assert!(report.erb.contains("<!DOCTYPE html>"));
    assert!(report.erb.contains("Hello <%= current_user.name %>!"));
    assert!(report.erb.contains("class=\"page-nav navbar\""));
    assert!(report.erb.contains("data-controller=\"nav\""));
}

#[test]
fn test_validator_flags_truncated_output() {
    let report = validate("<% if a %>\n<p>never closed</p>\n");
    assert!(!report.is_success());
}

// ---------------------------------------------------------------------------
// File driver
// ---------------------------------------------------------------------------

fn temp_workspace(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("haml2erb-test-{}-{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_convert_file_writes_erb_next_to_source() {
    let dir = temp_workspace("write");
    let input = dir.join("show.html.haml");
    fs::write(&input, "%p= user.name\n").unwrap();

    let result = convert_file(&input, &ConvertOptions::default());
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.path, dir.join("show.html.erb"));
    assert_eq!(
        fs::read_to_string(&result.path).unwrap(),
        "<p><%= user.name %></p>\n"
    );
    // The original stays put unless deletion was requested.
    assert!(input.exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = temp_workspace("dry");
    let input = dir.join("page.haml");
    fs::write(&input, "%div").unwrap();

    let options = ConvertOptions {
        dry_run: true,
        ..ConvertOptions::default()
    };
    let result = convert_file(&input, &options);
    assert!(result.is_success());
    assert!(result.dry_run);
    assert_eq!(result.content.as_deref(), Some("<div></div>\n"));
    assert!(!dir.join("page.erb").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_file_is_skipped_not_raised() {
    let result = convert_file(
        &PathBuf::from("no/such/place/missing.haml"),
        &ConvertOptions::default(),
    );
    assert!(result.skipped);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("missing.haml"));
}

#[test]
fn test_syntax_error_recorded_with_line_and_no_output() {
    let dir = temp_workspace("syntax");
    let input = dir.join("broken.haml");
    fs::write(&input, "%ul\n\t%li tabbed\n").unwrap();

    let result = convert_file(&input, &ConvertOptions::default());
    assert!(!result.is_success());
    assert!(!result.skipped);
    assert_eq!(result.errors[0].line, Some(2));
    assert!(!dir.join("broken.erb").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_delete_original_after_success() {
    let dir = temp_workspace("delete");
    let input = dir.join("gone.haml");
    fs::write(&input, "%div").unwrap();

    let options = ConvertOptions {
        delete_original: true,
        ..ConvertOptions::default()
    };
    let result = convert_file(&input, &options);
    assert!(result.is_success());
    assert!(!input.exists());
    assert!(dir.join("gone.erb").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_convert_directory_recurses_and_reports_per_file() {
    let dir = temp_workspace("walk");
    fs::create_dir_all(dir.join("admin")).unwrap();
    fs::write(dir.join("index.haml"), "%h1 Home").unwrap();
    fs::write(dir.join("admin/users.haml"), "%table").unwrap();
    fs::write(dir.join("admin/broken.haml"), "%p oops\n    %p too deep").unwrap();
    fs::write(dir.join("notes.txt"), "not a template").unwrap();

    let results = convert_directory(&dir, &ConvertOptions::default());
    assert_eq!(results.len(), 3);
    let failures: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].path.ends_with("admin/broken.erb"));
    assert!(dir.join("index.erb").exists());
    assert!(dir.join("admin/users.erb").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_check_option_appends_validation_findings() {
    let dir = temp_workspace("check");
    let input = dir.join("ok.haml");
    fs::write(&input, "- if a\n  %p A").unwrap();

    let options = ConvertOptions {
        validate: true,
        dry_run: true,
        ..ConvertOptions::default()
    };
    let result = convert_file(&input, &options);
    // A lone `- if` with children closes properly, so validation passes.
    assert!(result.is_success(), "{:?}", result.errors);

    fs::remove_dir_all(&dir).ok();
}
