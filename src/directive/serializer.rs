use super::{DIRECTIVE_MARKER, Params};

/// Keys written first, in this order, so regenerated directives diff cleanly.
pub const PRIORITY_KEYS: &[&str] = &["id", "fn", "link", "alt", "w", "ew", "eh", "align"];

pub fn serialize(params: &Params) -> String {
    let mut out = DIRECTIVE_MARKER.to_string();
    for key in PRIORITY_KEYS {
        if let Some(value) = params.get(key) {
            push_param(&mut out, key, value);
        }
    }
    for (key, value) in params.iter() {
        if !PRIORITY_KEYS.contains(&key) {
            push_param(&mut out, key, value);
        }
    }
    out
}

fn push_param(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push('=');
    out.push_str(&format_value(value));
}

/// Quotes values that are empty or contain whitespace.
pub fn format_value(value: &str) -> String {
    if !value.is_empty() && !value.chars().any(char::is_whitespace) {
        return value.to_string();
    }
    if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::parse_params;
    use proptest::prelude::*;

    #[test]
    fn priority_keys_come_first() {
        let params: Params = [
            ("pageno", "12"),
            ("align", "c"),
            ("w", "600px"),
            ("alt", "A dog"),
            ("fn", "i_005.jpg"),
            ("id", "i_005"),
            ("ew", "50%"),
        ]
        .into_iter()
        .collect();
        insta::assert_snapshot!(
            serialize(&params),
            @".il id=i_005 fn=i_005.jpg alt='A dog' w=600px ew=50% align=c pageno=12"
        );
    }

    #[test]
    fn quoting() {
        assert_eq!(format_value("600px"), "600px");
        assert_eq!(format_value(""), "''");
        assert_eq!(format_value("the dog's bone"), "\"the dog's bone\"");
    }

    fn params_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
        proptest::collection::vec(("[a-z]{1,6}", "[A-Za-z0-9%._ -]{0,12}"), 0..8)
    }

    proptest! {
        #[test]
        fn serialize_then_parse_recovers_entries(entries in params_strategy()) {
            let params: Params = entries.into_iter().collect();
            let (parsed, rejected) = parse_params(&serialize(&params));
            prop_assert!(rejected.is_empty());
            prop_assert!(parsed.same_entries(&params));
        }
    }
}
