/// Property-based tests using proptest
/// Tests invariants of the field validators and request schemas for all inputs
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use scoring_api::auth::user_token;
use scoring_api::fields::{
    BirthdayField, CharField, DateField, Field, FieldError, GenderField, Phone, PhoneField,
    Validator, DATE_FORMAT,
};
use scoring_api::models::{MethodEnvelope, ScoreArguments};
use serde_json::{json, Map, Value};

// Property: phone validation accepts exactly 11 digits starting with 7
proptest! {
    #[test]
    fn phone_validation_never_panics(phone in "\\PC*") {
        let _ = PhoneField.parse(&json!(phone));
    }

    #[test]
    fn valid_phones_round_trip(rest in 0u64..10_000_000_000u64) {
        let digits = format!("7{:010}", rest);
        let number: u64 = digits.parse().unwrap();

        let mut field = Field::new("phone", PhoneField, false, true);
        field.set(Some(&json!(digits))).unwrap();
        prop_assert_eq!(field.get(), Some(&Phone::Text(digits.clone())));

        field.set(Some(&json!(number))).unwrap();
        prop_assert_eq!(field.get(), Some(&Phone::Number(number)));
    }

    #[test]
    fn phones_with_other_leading_digit_rejected(first in 0u8..=9u8, rest in "[0-9]{10}") {
        prop_assume!(first != 7);
        let phone = format!("{}{}", first, rest);
        prop_assert!(PhoneField.parse(&json!(phone)).is_err());
    }

    #[test]
    fn phones_of_wrong_length_rejected(digits in "7[0-9]{0,20}") {
        prop_assume!(digits.len() != 11);
        prop_assert!(PhoneField.parse(&json!(digits)).is_err());
    }
}

// Property: required and nullable rules hold for every value kind
proptest! {
    #[test]
    fn required_fields_reject_absent_values(nullable in proptest::bool::ANY) {
        let mut field = Field::new("login", CharField, true, nullable);
        prop_assert_eq!(field.set(None), Err(FieldError::Missing));
        prop_assert_eq!(field.set(Some(&Value::Null)), Err(FieldError::Missing));
    }

    #[test]
    fn non_nullable_fields_reject_empty_values(
        empty in prop::sample::select(vec![json!(""), json!([]), json!({})])
    ) {
        let mut field = Field::new("method", CharField, true, false);
        prop_assert_eq!(field.set(Some(&empty)), Err(FieldError::Empty));
    }

    #[test]
    fn strings_round_trip(value in "\\PC+") {
        let mut field = Field::new("first_name", CharField, false, true);
        field.set(Some(&json!(value))).unwrap();
        prop_assert_eq!(field.get(), Some(&value));
    }

    #[test]
    fn gender_accepts_only_known_codes(code in -10i64..10i64) {
        let result = GenderField.parse(&json!(code));
        prop_assert_eq!(result.is_ok(), (0..=2).contains(&code));
    }
}

// Property: dates round-trip and the birthday limit is 70 * 365 days
proptest! {
    #[test]
    fn dates_round_trip(days in 0i64..60_000i64) {
        let date = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + Duration::days(days);
        let text = date.format(DATE_FORMAT).to_string();
        prop_assert_eq!(DateField.parse(&json!(text)), Ok(date));
    }

    #[test]
    fn birthday_limit_is_seventy_years_of_days(offset in 0i64..25_550i64) {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let field = BirthdayField::at(today);

        let inside = today - Duration::days(offset);
        let inside_text = inside.format(DATE_FORMAT).to_string();
        prop_assert!(field.parse(&json!(inside_text)).is_ok());

        let outside = today - Duration::days(25_551 + offset);
        let outside_text = outside.format(DATE_FORMAT).to_string();
        prop_assert!(field.parse(&json!(outside_text)).is_err());
    }
}

// Property: schema construction never panics on arbitrary objects
proptest! {
    #[test]
    fn envelope_never_panics(
        login in proptest::option::of("\\PC{0,8}"),
        method in proptest::option::of("[a-z_]{0,20}"),
        token_is_number in proptest::bool::ANY
    ) {
        let mut body = Map::new();
        if let Some(login) = login {
            body.insert("login".to_string(), json!(login));
        }
        if let Some(method) = method {
            body.insert("method".to_string(), json!(method));
        }
        body.insert(
            "token".to_string(),
            if token_is_number { json!(1) } else { json!("t") },
        );
        body.insert("arguments".to_string(), json!({}));
        let _ = MethodEnvelope::from_body(&body);
    }

    #[test]
    fn score_arguments_never_panic(
        phone in proptest::option::of("[0-9]{0,12}"),
        gender in proptest::option::of(-3i64..6i64),
        birthday in proptest::option::of("[0-9]{2}\\.[0-9]{2}\\.[0-9]{4}")
    ) {
        let mut args = Map::new();
        if let Some(phone) = phone {
            args.insert("phone".to_string(), json!(phone));
        }
        if let Some(gender) = gender {
            args.insert("gender".to_string(), json!(gender));
        }
        if let Some(birthday) = birthday {
            args.insert("birthday".to_string(), json!(birthday));
        }
        if let Ok(score) = ScoreArguments::from_arguments(&args) {
            let _ = score.has_any_required_pair();
        }
    }

    #[test]
    fn user_tokens_are_sha512_hex(account in "\\PC{0,16}", login in "\\PC{0,16}") {
        let token = user_token(&account, &login);
        prop_assert_eq!(token.len(), 128);
        prop_assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
