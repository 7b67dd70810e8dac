//! Integration coverage for the public builder API, driven through the same
//! scenarios the accumulator is used for in anger: many small appends and
//! prepends, occasional truncation and trimming, one flatten at the end.

use spanstr::{Error, SpanBuilder, Value};

const CHUNK_SPLIT_SOURCE: &str = "ABC123XYZ";

/// Small first chunk so the content is guaranteed to span several chunks
fn multi_chunk_builder() -> SpanBuilder<'static> {
    let mut b = SpanBuilder::with_capacity(2);
    b.append("ABC").unwrap();
    b.append_range("*123*", 1, 3).unwrap();
    b.append("XYZ").unwrap();
    b
}

#[test]
fn empty_builders_flatten_to_empty() {
    assert_eq!(SpanBuilder::new().flatten().unwrap(), "");
    assert_eq!(SpanBuilder::new().len(), 0);
    assert_eq!(SpanBuilder::with_capacity(42).flatten().unwrap(), "");
    assert_eq!(SpanBuilder::with_capacity(0).flatten().unwrap(), "");
}

#[test]
fn from_str_round_trips() {
    for s in ["Hello", "", "a", "héllo wörld", "  spaced  "] {
        let b = SpanBuilder::from_str(s);
        assert_eq!(b.flatten().unwrap(), s);
        assert_eq!(b.len(), s.len());

        let b = SpanBuilder::from_str_with_capacity(s, 42);
        assert_eq!(b.flatten().unwrap(), s);

        let b = SpanBuilder::from_str_with_capacity(s, 0);
        assert_eq!(b.flatten().unwrap(), s);
    }
}

#[test]
fn append_table() {
    let cases: &[(&str, &str, usize, usize, &str)] = &[
        ("Hello", "abc", 0, 3, "Helloabc"),
        ("Hello", "def", 1, 2, "Helloef"),
        ("Hello", "def", 2, 1, "Hellof"),
        ("", "g", 0, 1, "g"),
        ("Hello", "g", 1, 0, "Hello"),
        ("Hello", "g", 0, 0, "Hello"),
        ("Hello", "", 0, 0, "Hello"),
    ];
    for &(original, value, start, len, expected) in cases {
        let mut b = SpanBuilder::from_str(original);
        b.append_range(value, start, len).unwrap();
        assert_eq!(b.flatten().unwrap(), expected);

        if start == 0 && len == value.len() {
            let mut b = SpanBuilder::from_str(original);
            b.append(value).unwrap();
            assert_eq!(b.flatten().unwrap(), expected);
        }
    }
}

#[test]
fn prepend_table() {
    let cases: &[(&str, &str, usize, usize, &str)] = &[
        ("Hello", "abc", 0, 3, "abcHello"),
        ("Hello", "def", 1, 2, "efHello"),
        ("Hello", "def", 2, 1, "fHello"),
        ("", "g", 0, 1, "g"),
        ("Hello", "g", 1, 0, "Hello"),
        ("Hello", "g", 0, 0, "Hello"),
        ("Hello", "", 0, 0, "Hello"),
    ];
    for &(original, value, start, len, expected) in cases {
        let mut b = SpanBuilder::from_str(original);
        b.prepend_range(value, start, len).unwrap();
        assert_eq!(b.flatten().unwrap(), expected);

        if start == 0 && len == value.len() {
            let mut b = SpanBuilder::from_str(original);
            b.prepend(value).unwrap();
            assert_eq!(b.flatten().unwrap(), expected);
        }
    }
}

#[test]
fn range_validation_leaves_the_builder_untouched() {
    let mut b = SpanBuilder::from_str("Hello");
    assert!(matches!(
        b.append_range("hello", 5, 1),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
        b.prepend_range("hello", 4, 2),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(b.set_len(6), Err(Error::OutOfRange { .. })));
    assert_eq!(b.flatten().unwrap(), "Hello");
    assert_eq!(b.len(), 5);
}

#[test]
fn growth_boundary_spans_chunks() {
    // Three appends against a two-slot first chunk must cross a chunk edge
    let b = multi_chunk_builder();
    assert_eq!(b.flatten().unwrap(), CHUNK_SPLIT_SOURCE);
    assert_eq!(b.to_string(), CHUNK_SPLIT_SOURCE);
    assert_eq!(b.len(), CHUNK_SPLIT_SOURCE.len());
}

#[test]
fn appends_exceeding_any_capacity_keep_order() {
    let words = [
        "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    ];
    for cap in [0, 1, 2, 3, 8] {
        let mut b = SpanBuilder::with_capacity(cap);
        let mut expected = String::new();
        for w in words {
            b.append(w).unwrap();
            expected.push_str(w);
        }
        assert_eq!(b.flatten().unwrap(), expected, "capacity {cap}");
    }
}

#[test]
fn prepends_logically_precede_appends() {
    let mut b = SpanBuilder::with_capacity(2);
    b.append("cde").unwrap();
    b.prepend("b").unwrap();
    b.append("f").unwrap();
    b.prepend("a").unwrap();
    assert_eq!(b.flatten().unwrap(), "abcdef");
}

#[test]
fn prepend_after_trim_to_empty() {
    let mut b = SpanBuilder::new();
    b.append("  ").unwrap();
    b.trim_start();
    b.prepend("Hello").unwrap();
    assert_eq!(b.flatten().unwrap(), "Hello");
}

#[test]
fn prepend_expands_a_full_single_slot_chunk() {
    let mut b = SpanBuilder::with_capacity(1);
    b.append("Hello").unwrap();
    b.prepend("ABC").unwrap();
    b.prepend("123").unwrap();
    assert_eq!(b.flatten().unwrap(), "123ABCHello");
}

#[test]
fn set_len_truncates_and_rejects_growth() {
    let mut b = SpanBuilder::from_str("Hello");
    b.set_len(2).unwrap();
    assert_eq!(b.len(), 2);
    assert_eq!(b.flatten().unwrap(), "He");
    assert!(matches!(b.set_len(3), Err(Error::OutOfRange { .. })));
}

#[test]
fn set_len_across_chunks_then_reuse() {
    let mut b = multi_chunk_builder();
    b.set_len(2).unwrap();
    assert_eq!(b.flatten().unwrap(), "AB");
    b.append("!").unwrap();
    b.append("?").unwrap();
    assert_eq!(b.flatten().unwrap(), "AB!?");
}

#[test]
fn clear_then_rebuild() {
    let mut b = multi_chunk_builder();
    b.clear();
    assert_eq!(b.len(), 0);
    assert!(b.is_empty());
    b.append("rebuilt").unwrap();
    assert_eq!(b.flatten().unwrap(), "rebuilt");
}

#[test]
fn append_line_variants() {
    let mut b = SpanBuilder::from_str("Hello");
    b.append_line().unwrap();
    assert_eq!(b.flatten().unwrap(), "Hello\n");

    let mut b = SpanBuilder::from_str("Hello");
    b.append_line_str("abc").unwrap();
    assert_eq!(b.flatten().unwrap(), "Helloabc\n");

    let mut b = SpanBuilder::from_str("Hello");
    b.append_line_str("!").unwrap();
    assert_eq!(b.flatten().unwrap(), "Hello!\n");
}

#[test]
fn trim_parity_with_str() {
    let groups: &[&[&str]] = &[
        &["Hello"],
        &["  Hello  "],
        &["        Hello          "],
        &["123", "  ", "Hello", "  ", "abc"],
        &["  ", "Hello", "  "],
        &["      \t      "],
        &["Hello", "  "],
        &["  ", "Hello"],
        &["\u{3000}", "wide", "\u{00A0}"],
    ];
    for parts in groups {
        let joined: String = parts.concat();

        let mut b = SpanBuilder::with_capacity(2);
        for p in *parts {
            b.append(p).unwrap();
        }
        assert_eq!(b.trim().flatten().unwrap(), joined.trim(), "{parts:?}");

        let mut b = SpanBuilder::with_capacity(2);
        for p in *parts {
            b.append(p).unwrap();
        }
        assert_eq!(
            b.trim_start().flatten().unwrap(),
            joined.trim_start(),
            "{parts:?}"
        );

        let mut b = SpanBuilder::with_capacity(2);
        for p in *parts {
            b.append(p).unwrap();
        }
        assert_eq!(
            b.trim_end().flatten().unwrap(),
            joined.trim_end(),
            "{parts:?}"
        );
    }
}

#[test]
fn trim_on_substrings() {
    let cases: &[(&str, usize, usize)] = &[
        ("Hello", 2, 3),
        ("  Hello  ", 2, 5),
        ("        Hello          ", 2, 12),
        ("Hello  ", 0, 5),
    ];
    for &(s, start, len) in cases {
        let expected = &s[start..start + len];

        let mut b = SpanBuilder::with_capacity(2);
        b.append_range(s, start, len).unwrap();
        assert_eq!(b.trim().flatten().unwrap(), expected.trim());

        let mut b = SpanBuilder::with_capacity(2);
        b.append_range(s, start, len).unwrap();
        assert_eq!(b.trim_end().flatten().unwrap(), expected.trim_end());

        let mut b = SpanBuilder::with_capacity(2);
        b.append_range(s, start, len).unwrap();
        assert_eq!(b.trim_start().flatten().unwrap(), expected.trim_start());
    }
}

#[test]
fn trim_to_empty_leaves_a_usable_builder() {
    let mut b = SpanBuilder::with_capacity(1);
    b.append("  ").unwrap();
    b.append("\t\t").unwrap();
    b.append("   ").unwrap();
    b.trim();
    assert_eq!(b.len(), 0);
    b.append("next").unwrap();
    assert_eq!(b.flatten().unwrap(), "next");
}

#[test]
fn copy_to_simple_windows() {
    let cases: &[(&str, usize, usize, usize, usize, &[u8])] = &[
        ("Hello", 0, 5, 0, 5, b"Hello"),
        ("Hello", 0, 6, 1, 5, b"\0Hello"),
        ("Hello", 0, 4, 0, 4, b"Hell"),
        ("Hello", 1, 7, 2, 4, b"\0\0ello\0"),
    ];
    for &(value, src_index, dest_len, dest_index, count, expected) in cases {
        let b = SpanBuilder::from_str(value);
        let mut dest = vec![0u8; dest_len];
        b.copy_to(src_index, &mut dest, dest_index, count).unwrap();
        assert_eq!(dest, expected);
    }
}

#[test]
fn copy_to_windows_across_chunks() {
    let b = multi_chunk_builder();
    let len = b.len();

    let mut dest = vec![0u8; len];
    b.copy_to(0, &mut dest, 0, len).unwrap();
    assert_eq!(dest, CHUNK_SPLIT_SOURCE.as_bytes());

    let mut dest = vec![0u8; len - 2];
    b.copy_to(1, &mut dest, 0, len - 2).unwrap();
    assert_eq!(dest, &CHUNK_SPLIT_SOURCE.as_bytes()[1..len - 1]);

    let mut dest = vec![0u8; len - 4];
    b.copy_to(0, &mut dest, 0, len - 4).unwrap();
    assert_eq!(dest, &CHUNK_SPLIT_SOURCE.as_bytes()[..len - 4]);

    let mut dest = vec![0u8; 1];
    b.copy_to(3, &mut dest, 0, 1).unwrap();
    assert_eq!(dest, &CHUNK_SPLIT_SOURCE.as_bytes()[3..4]);
}

#[test]
fn copy_to_all_windows_match_flatten() {
    let b = multi_chunk_builder();
    let flat = b.flatten().unwrap();
    for i in 0..=flat.len() {
        for n in 0..=flat.len() - i {
            let mut dest = vec![0u8; n];
            b.copy_to(i, &mut dest, 0, n).unwrap();
            assert_eq!(dest, &flat.as_bytes()[i..i + n], "window {i}+{n}");
        }
    }
}

#[test]
fn copy_to_invalid_arguments() {
    let b = SpanBuilder::from_str("Hello");
    let mut dest = [0u8; 10];
    assert!(matches!(
        b.copy_to(6, &mut dest, 0, 0),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
        b.copy_to(5, &mut dest, 0, 1),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
        b.copy_to(4, &mut dest, 0, 2),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
        b.copy_to(0, &mut dest, 10, 1),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
        b.copy_to(0, &mut dest, 9, 2),
        Err(Error::OutOfRange { .. })
    ));
}

#[test]
fn starts_with_table() {
    let cases: &[(&str, usize, usize, char, bool)] = &[
        ("Hello", 0, 5, 'H', true),
        ("Hello", 1, 3, 'H', false),
        ("Hello", 1, 3, 'e', true),
        ("Hello", 0, 5, 'h', false),
        ("", 0, 0, 'h', false),
    ];
    for &(s, start, len, c, expected) in cases {
        let mut b = SpanBuilder::new();
        b.append_range(s, start, len).unwrap();
        assert_eq!(b.starts_with(c), expected, "{s:?}[{start}..+{len}] vs {c:?}");
    }
}

#[test]
fn ends_with_table() {
    let cases: &[(&str, usize, usize, char, bool)] = &[
        ("Hello", 0, 5, 'o', true),
        ("Hello", 1, 3, 'o', false),
        ("Hello", 1, 3, 'l', true),
        ("Hello", 0, 5, 'O', false),
        ("", 0, 0, 'o', false),
    ];
    for &(s, start, len, c, expected) in cases {
        let mut b = SpanBuilder::new();
        b.append_range(s, start, len).unwrap();
        assert_eq!(b.ends_with(c), expected, "{s:?}[{start}..+{len}] vs {c:?}");
    }
}

#[test]
fn edge_queries_reach_across_chunks() {
    // First and last characters live in different chunks than the
    // most recently recorded span
    let mut b = SpanBuilder::with_capacity(1);
    b.append("head").unwrap();
    b.append("middle").unwrap();
    b.prepend("!").unwrap();
    assert!(b.starts_with('!'));
    assert!(b.ends_with('e'));
    assert_eq!(b.flatten().unwrap(), "!headmiddle");
}

#[test]
fn multibyte_edges() {
    let mut b = SpanBuilder::with_capacity(1);
    b.append("héllo").unwrap();
    b.prepend("ß").unwrap();
    assert!(b.starts_with('ß'));
    assert!(b.ends_with('o'));
    b.clear();
    b.append("ö").unwrap();
    assert!(b.ends_with('ö'));
}

#[test]
fn format_into_existing_content() {
    let mut b = SpanBuilder::from_str("Hello");
    b.append_format(", Foo {0}", &[Value::Str("Bar")]).unwrap();
    assert_eq!(b.flatten().unwrap(), "Hello, Foo Bar");

    let mut b = SpanBuilder::from_str("Hello");
    b.append_format(", Foo {0,9:D6}", &[Value::Int(1)]).unwrap();
    assert_eq!(b.flatten().unwrap(), "Hello, Foo    000001");
}

#[test]
fn format_spec_catalog() {
    let mut b = SpanBuilder::new();
    b.append_format("{0,5}", &[Value::Str("ab")]).unwrap();
    assert_eq!(b.flatten().unwrap(), "   ab");

    let mut b = SpanBuilder::new();
    b.append_format("{0,-5}", &[Value::Str("ab")]).unwrap();
    assert_eq!(b.flatten().unwrap(), "ab   ");

    let mut b = SpanBuilder::new();
    b.append_format("{0:D6}", &[Value::Int(1)]).unwrap();
    assert_eq!(b.flatten().unwrap(), "000001");

    let mut b = SpanBuilder::new();
    b.append_format("{{{0}", &[Value::Int(1)]).unwrap();
    assert_eq!(b.flatten().unwrap(), "{1");
}

#[test]
fn format_errors_do_not_lose_prior_content() {
    let mut b = SpanBuilder::from_str("Hello");
    assert!(matches!(
        b.append_format("{1}", &[Value::Str("x")]),
        Err(Error::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        b.append_format("}", &[Value::Str("x")]),
        Err(Error::InvalidFormat { .. })
    ));
    assert_eq!(b.flatten().unwrap(), "Hello");
}

#[test]
fn value_from_conversions() {
    let mut b = SpanBuilder::new();
    b.append_format(
        "{0} {1} {2} {3} {4}",
        &[
            Value::from("s"),
            Value::from(7i32),
            Value::from(8u32),
            Value::from(true),
            Value::from('c'),
        ],
    )
    .unwrap();
    assert_eq!(b.flatten().unwrap(), "s 7 8 true c");
}

#[test]
fn mixed_operation_scenario() {
    // Template assembly: many small writes, one flatten
    let mut b = SpanBuilder::with_capacity(2);
    b.append("<li>").unwrap();
    b.append_format("{0,3}: {1}", &[Value::Int(7), Value::Str("seven")])
        .unwrap();
    b.append("</li>").unwrap();
    b.prepend("<ul>").unwrap();
    b.append("</ul>").unwrap();
    assert_eq!(
        b.flatten().unwrap(),
        "<ul><li>  7: seven</li></ul>"
    );

    b.set_len("<ul><li>".len()).unwrap();
    b.trim_start();
    assert_eq!(b.flatten().unwrap(), "<ul><li>");
}
