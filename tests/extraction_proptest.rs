// Property-based tests for the Ruby extraction round trip.
// Generated templates are built from constructs the extractor fully supports:
// 1. Feeding the generated source back unchanged leaves the template as is
// 2. Extraction is deterministic
// 3. Every generated line maps into the template
// 4. Doubling the indentation of the generated source doubles it in the
//    template, which still parses

use hamlint_lib::ruby_extraction::{Coordinator, ExtractionOptions, FixedSuffixes};
use hamlint_lib::template::parse;
use proptest::prelude::*;

fn ident() -> impl Strategy<Value = String> {
    "[a-z]{1,6}".prop_map(|s| format!("v_{s}"))
}

fn words() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,8}", 1..4).prop_map(|words| words.join(" "))
}

fn tag_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("p"), Just("div"), Just("span")]
}

/// One top-level construct, possibly spanning several lines.
fn block() -> impl Strategy<Value = Vec<String>> {
    prop_oneof![
        words().prop_map(|text| vec![text]),
        (ident(), 0..100u32).prop_map(|(name, value)| vec![format!("- {name} = {value}")]),
        (ident(), ident()).prop_map(|(method, arg)| vec![format!("= {method}({arg})")]),
        (tag_name(), ident(), 0..10u32).prop_map(|(tag, key, value)| vec![format!("%{tag}{{{key}: {value}}}")]),
        (tag_name(), ident()).prop_map(|(tag, name)| vec![format!("%{tag}= {name}")]),
        (tag_name(), words()).prop_map(|(tag, text)| vec![format!("%{tag} {text}")]),
        words().prop_map(|text| vec![format!("-# {text}")]),
        (ident(), words()).prop_map(|(cond, text)| vec![format!("- if {cond}"), format!("  {text}")]),
        (ident(), ident()).prop_map(|(list, method)| vec![
            format!("- {list}.each do |item|"),
            format!("  = item.{method}"),
        ]),
        Just(vec![String::new()]),
    ]
}

fn with_doubled_indent(line: &str) -> String {
    let indent = line.len() - line.trim_start_matches(' ').len();
    format!("{}{line}", " ".repeat(indent))
}

fn template_source() -> impl Strategy<Value = String> {
    prop::collection::vec(block(), 1..12).prop_map(|blocks| {
        let mut source = blocks.concat().join("\n");
        source.push('\n');
        source
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn unchanged_source_round_trips(source in template_source()) {
        let template = parse(&source).unwrap();
        let mut coordinator = Coordinator::new(&template, ExtractionOptions::default());
        let ruby = coordinator.extract_ruby_source(&mut FixedSuffixes::new(["x"])).unwrap();

        let lines = coordinator.template_lines_with_corrections_applied(&ruby.source).unwrap();
        prop_assert_eq!(lines, template.lines.clone());
    }

    #[test]
    fn extraction_is_deterministic(source in template_source()) {
        let template = parse(&source).unwrap();
        let mut first = Coordinator::new(&template, ExtractionOptions::default());
        let mut second = Coordinator::new(&template, ExtractionOptions::default());
        let a = first.extract_ruby_source(&mut FixedSuffixes::new(["x"])).unwrap();
        let b = second.extract_ruby_source(&mut FixedSuffixes::new(["x"])).unwrap();

        prop_assert_eq!(&a.source, &b.source);
        prop_assert_eq!(&a.source_map, &b.source_map);
    }

    #[test]
    fn source_map_stays_in_template(source in template_source()) {
        let template = parse(&source).unwrap();
        let mut coordinator = Coordinator::new(&template, ExtractionOptions::default());
        let ruby = coordinator.extract_ruby_source(&mut FixedSuffixes::new(["x"])).unwrap();

        prop_assert_eq!(ruby.line_count(), ruby.source.lines().count());
        for line in 1..=ruby.line_count() {
            let idx = ruby.template_line_index(line);
            prop_assert!(idx.is_some_and(|idx| idx < template.lines.len()));
        }
    }

    #[test]
    fn doubled_indentation_reaches_the_template(source in template_source()) {
        let template = parse(&source).unwrap();
        let mut coordinator = Coordinator::new(&template, ExtractionOptions::default());
        let ruby = coordinator.extract_ruby_source(&mut FixedSuffixes::new(["x"])).unwrap();

        let doubled: String = ruby
            .source
            .lines()
            .map(|line| format!("{}\n", with_doubled_indent(line)))
            .collect();
        let lines = coordinator.template_lines_with_corrections_applied(&doubled).unwrap();

        let expected: Vec<String> = template.lines.iter().map(|line| with_doubled_indent(line)).collect();
        prop_assert_eq!(&lines, &expected);
        prop_assert!(parse(&template.render_lines(&lines)).is_ok());
    }
}
