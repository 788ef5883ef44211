//! Non-mutating `key[=value]` property parser (C9), used to pull
//! reconfiguration commands out of an incoming SMS body without needing a
//! mutable scratch buffer.
//!
//! Grounded on `property_parser.h`/`property_parser.c`: a small state
//! machine (`NotStarted` → `InKey` → `ReceivedEquals` → `InValue`) walked
//! once over the input. A key/value pair ends at `=` (closing the key and
//! opening the value), or at `\r`/`\n` (closing whatever is currently open).
//! A bare key with no `=` yields `(key, None)` — this is how single-word SMS
//! commands (`START`, `STOP`, `RESET`, ...) are told apart from `key=value`
//! settings commands.

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    NotStarted,
    InKey,
    ReceivedEquals,
    InValue,
}

/// Splits `input` into `(key, value)` pairs. `value` is `None` for a bare
/// key with no `=`, and `Some(String::new())` for `key=` with nothing after
/// the `=`.
pub fn parse_properties(input: &str) -> Vec<(String, Option<String>)> {
    let mut pairs = Vec::new();
    let mut state = State::NotStarted;
    let mut key_start = 0;
    let mut key_end = 0;
    let mut value_start = 0;

    let bytes = input.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match (state, b) {
            (State::NotStarted, b'\r' | b'\n') => {}
            (State::NotStarted, _) => {
                state = State::InKey;
                key_start = i;
            }
            (State::InKey, b'=') => {
                key_end = i;
                state = State::ReceivedEquals;
            }
            (State::InKey, b'\r' | b'\n') => {
                pairs.push((input[key_start..i].to_string(), None));
                state = State::NotStarted;
            }
            (State::InKey, _) => {}
            (State::ReceivedEquals, b'\r' | b'\n') => {
                pairs.push((input[key_start..key_end].to_string(), Some(String::new())));
                state = State::NotStarted;
            }
            (State::ReceivedEquals, _) => {
                state = State::InValue;
                value_start = i;
            }
            (State::InValue, b'\r' | b'\n') => {
                pairs.push((
                    input[key_start..key_end].to_string(),
                    Some(input[value_start..i].to_string()),
                ));
                state = State::NotStarted;
            }
            (State::InValue, _) => {}
        }
    }

    // Flush whatever was still open when the input ended, with no
    // terminating `\r`/`\n`.
    match state {
        State::InKey => pairs.push((input[key_start..].to_string(), None)),
        State::ReceivedEquals => pairs.push((input[key_start..key_end].to_string(), Some(String::new()))),
        State::InValue => pairs.push((
            input[key_start..key_end].to_string(),
            Some(input[value_start..].to_string()),
        )),
        State::NotStarted => {}
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_pair() {
        assert_eq!(
            parse_properties("interval=60"),
            vec![("interval".to_string(), Some("60".to_string()))]
        );
    }

    #[test]
    fn parses_multiple_lines() {
        let input = "interval=60\r\napn=internet\r\n";
        assert_eq!(
            parse_properties(input),
            vec![
                ("interval".to_string(), Some("60".to_string())),
                ("apn".to_string(), Some("internet".to_string())),
            ]
        );
    }

    #[test]
    fn ignores_leading_blank_lines() {
        assert_eq!(
            parse_properties("\r\n\r\ninterval=60"),
            vec![("interval".to_string(), Some("60".to_string()))]
        );
    }

    #[test]
    fn bare_key_with_no_equals_yields_none_value() {
        assert_eq!(
            parse_properties("START\r\ninterval=60"),
            vec![
                ("START".to_string(), None),
                ("interval".to_string(), Some("60".to_string())),
            ]
        );
    }

    #[test]
    fn trailing_pair_without_terminator_is_still_yielded() {
        assert_eq!(
            parse_properties("interval=60"),
            vec![("interval".to_string(), Some("60".to_string()))]
        );
    }

    #[test]
    fn trailing_bare_key_without_terminator_is_still_yielded() {
        assert_eq!(parse_properties("RESTART"), vec![("RESTART".to_string(), None)]);
    }

    #[test]
    fn key_with_empty_value_yields_some_empty_string() {
        assert_eq!(
            parse_properties("APN=\r\n"),
            vec![("APN".to_string(), Some(String::new()))]
        );
    }
}
