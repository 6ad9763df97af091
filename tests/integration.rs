//! End-to-end codec tests: records rendered to wire text and parsed back.

use wiretext::{
    compile, record, Candidate, Codec, CodecError, FieldError, FieldValue, MapRecord, Record,
    RecordSpec, Representation, Value,
};

const STX: char = '\u{02}';
const ETX: char = '\u{03}';

// ---- record types ----

#[derive(Debug, Default, Clone, PartialEq)]
struct MyName {
    my_name: String,
}

record!(MyName => RecordSpec::new("MyName").template("my-\\{name\\}-is-{my_name}");
    fields { my_name }
);

#[derive(Debug, Default, Clone, PartialEq)]
struct OptionalContent {
    optional: Option<String>,
    setting: String,
}

record!(OptionalContent =>
    RecordSpec::new("OptionalContent").template("a-[?{optional}\\!]-{5:setting}-message<CR><LF>");
    fields { optional, setting }
);

#[derive(Debug, Default, Clone, PartialEq)]
struct Ending {
    beginning: Option<String>,
    ending: String,
}

record!(Ending => RecordSpec::new("Ending").template("[{beginning}-]{ending}");
    fields { beginning, ending }
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Content {
    ValueA,
    ValueB,
    ValueC,
}

impl FieldValue for Content {
    fn to_value(&self) -> Value {
        Value::text(match self {
            Content::ValueA => "VALUE_A",
            Content::ValueB => "VALUE_B",
            Content::ValueC => "VALUE_C",
        })
    }

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match value.as_text() {
            Some("VALUE_A") => Ok(Content::ValueA),
            Some("VALUE_B") => Ok(Content::ValueB),
            Some("VALUE_C") => Ok(Content::ValueC),
            _ => Err(FieldError::TypeCoercion {
                field: field.to_string(),
                value: value.to_string(),
                expected: "Content",
            }),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct EnumContent {
    content: Option<Content>,
}

record!(EnumContent => RecordSpec::new("EnumContent")
    .template("test-{content}-1<CR>")
    .represent(
        "content",
        Representation::new()
            .entry("VALUE_A", "A")
            .entry("VALUE_B", "B")
            .entry("VALUE_C", "C"),
    );
    fields { content }
);

#[derive(Debug, Default, Clone, PartialEq)]
struct Callback {
    back: String,
    shouted: String,
    doubled: String,
}

impl Callback {
    fn shout(&mut self) -> bool {
        self.shouted = self.back.to_uppercase();
        true
    }

    fn double(&mut self) -> bool {
        self.doubled = format!("{0}{0}", self.back);
        true
    }
}

record!(Callback => RecordSpec::new("Callback")
    .template("call-{back}-message")
    .field_hook("back", "callback")
    .type_hook("classCallback");
    fields { back }
    hooks { "callback" => shout, "classCallback" => double }
);

#[derive(Debug, Default, Clone, PartialEq)]
struct Ecc {
    part: Option<String>,
}

record!(Ecc => RecordSpec::new("Ecc").template("<STX>~coming-[*{part}]<ETX>:eccRef~!eccRef!");
    fields { part }
);

#[derive(Debug, Default, Clone, PartialEq)]
struct ArrayMessage {
    keys: Vec<String>,
    values: Vec<String>,
}

record!(ArrayMessage =>
    RecordSpec::new("ArrayMessage").template("message-data-\\>\\(({keys}\\:{values}:,)\\)<CR><LF>");
    fields { keys, values }
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    New,
    Old,
}

impl FieldValue for Tag {
    fn to_value(&self) -> Value {
        Value::text(match self {
            Tag::New => "New",
            Tag::Old => "Old",
        })
    }

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match value.as_text() {
            Some("New") => Ok(Tag::New),
            Some("Old") => Ok(Tag::Old),
            _ => Err(FieldError::TypeCoercion {
                field: field.to_string(),
                value: value.to_string(),
                expected: "Tag",
            }),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Mega {
    keys: Option<Vec<String>>,
    values: Option<Vec<String>>,
    tag: Option<Tag>,
    extra: i32,
}

impl Mega {
    fn new(keys: &[&str], values: &[&str], tag: Option<Tag>, extra: i32) -> Self {
        Mega {
            keys: Some(keys.iter().map(|s| s.to_string()).collect()),
            values: Some(values.iter().map(|s| s.to_string()).collect()),
            tag,
            extra,
        }
    }

    fn double_extra(&mut self) -> bool {
        self.extra *= 2;
        true
    }
}

record!(Mega => RecordSpec::new("Mega")
    .template("<STX>\\\\mega\\\\(\\([{keys}\\:]{values}\\):<CR><LF>)\\\\[\\!{tag}[\\[{extra}\\]]\\!]<ETX>")
    .field_hook("extra", "extra")
    .represent("tag", Representation::new().entry("New", "NEW").entry("Old", "OLD"));
    fields { keys, values, tag, extra }
    hooks { "extra" => double_extra }
);

#[derive(Debug, Default)]
struct Plain;

record!(Plain => RecordSpec::new("Plain").template("/?<ACK>message\\[\\]<CR><LF>");
    fields {}
);

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---- scenarios ----

#[test]
fn single_field() {
    let codec = Codec::new();
    let mut record = MapRecord::new(RecordSpec::new("Name").template("{name}")).with("name", "John Doe");
    let wire = codec.serialize(&mut record).unwrap();
    assert_eq!(wire, "John Doe");

    let mut parsed = MapRecord::new(RecordSpec::new("Name").template("{name}"));
    codec.deserialize_into(&mut parsed, &wire).unwrap();
    assert_eq!(parsed.get("name"), Some(&Value::text("John Doe")));
}

#[test]
fn escaped_controls_and_fields() {
    let codec = Codec::new();
    let mut message = MyName {
        my_name: "John Doe".into(),
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "my-{name}-is-John Doe");
    let parsed: MyName = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed.my_name, "John Doe");
}

#[test]
fn static_content_and_symbols() {
    let codec = Codec::new();
    let wire = codec.serialize(&mut Plain).unwrap();
    assert_eq!(wire, "/?\u{06}message[]\r\n");
    codec.deserialize::<Plain>(&wire).unwrap();
    assert!(codec.deserialize::<Plain>("/?message[]\r\n").is_err());
}

#[test]
fn optional_left_out_when_unset() {
    let codec = Codec::new();
    let mut message = OptionalContent {
        optional: None,
        setting: "nicer".into(),
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "a--nicer-message\r\n");
    let parsed: OptionalContent = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed.optional, None);
    assert_eq!(parsed.setting, "nicer");

    let mut message = OptionalContent {
        optional: Some("very".into()),
        setting: "great".into(),
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "a-?very!-great-message\r\n");
    let parsed: OptionalContent = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed, message);
}

#[test]
fn fixed_length_pads_and_truncates() {
    let codec = Codec::new();
    let mut message = OptionalContent {
        optional: Some("totally".into()),
        setting: "fine".into(),
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "a-?totally!-fine -message\r\n");
    let parsed: OptionalContent = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed.optional.as_deref(), Some("totally"));
    assert_eq!(parsed.setting, "fine ");

    let mut message = OptionalContent {
        optional: Some("not".into()),
        setting: "perfect".into(),
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "a-?not!-perfe-message\r\n");
    let parsed: OptionalContent = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed.setting, "perfe");
}

#[test]
fn optional_at_start_before_unbounded_field() {
    let codec = Codec::new();
    let mut message = Ending {
        beginning: Some("one".into()),
        ending: "ending".into(),
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "one-ending");
    let parsed: Ending = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed, message);

    let mut message = Ending {
        beginning: None,
        ending: "ending".into(),
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "ending");
    let parsed: Ending = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed.beginning, None);
    assert_eq!(parsed.ending, "ending");
}

#[test]
fn represented_values() {
    let codec = Codec::new();
    let mut message = EnumContent {
        content: Some(Content::ValueB),
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "test-B-1\r");
    let parsed: EnumContent = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed.content, Some(Content::ValueB));
}

#[test]
fn hooks_run_in_both_directions() {
    let codec = Codec::new();
    let mut message = Callback {
        back: "hello".into(),
        ..Default::default()
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "call-hello-message");
    assert_eq!(message.back, "hello");
    assert_eq!(message.shouted, "HELLO");
    assert_eq!(message.doubled, "hellohello");

    let parsed: Callback = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed.back, "hello");
    assert_eq!(parsed.shouted, "HELLO");
    assert_eq!(parsed.doubled, "hellohello");
}

#[test]
fn failing_hook_aborts() {
    fn refuse(_: &mut std::collections::BTreeMap<String, Value>) -> bool {
        false
    }
    let spec = RecordSpec::new("Refusing").template("x-{a}").field_hook("a", "refuse");
    let mut record = MapRecord::new(spec).with("a", "1").with_hook("refuse", refuse);
    let err = Codec::new().serialize(&mut record).unwrap_err();
    assert!(matches!(err, CodecError::CallbackFailure { ref hook, .. } if hook == "refuse"));
}

#[test]
fn checksum_frames() {
    let codec = Codec::new();
    for (part, check) in [("eccTest1", 'g'), ("eccTest2", 'd'), ("eccTest3", 'e')] {
        let mut message = Ecc {
            part: Some(part.into()),
        };
        let wire = codec.serialize(&mut message).unwrap();
        assert_eq!(wire, format!("{}coming-*{}{}{}", STX, part, ETX, check));
        let parsed: Ecc = codec.deserialize(&wire).unwrap();
        assert_eq!(parsed.part.as_deref(), Some(part));
    }
}

#[test]
fn corrupted_checksum_frame_is_rejected() {
    let codec = Codec::new();
    let mut message = Ecc {
        part: Some("eccTest3".into()),
    };
    let wire = codec.serialize(&mut message).unwrap();
    let damaged = wire.replace('e', "f");
    let err = codec.deserialize::<Ecc>(&damaged).unwrap_err();
    assert!(matches!(
        err,
        CodecError::ChecksumMismatch { expected: 'e', found: 'f', .. }
    ));
}

#[test]
fn checksum_over_single_field() {
    let codec = Codec::new();
    let spec = RecordSpec::new("Body").template("~{body}:ref~!ref!");
    let mut record = MapRecord::new(spec.clone()).with("body", "X");
    let wire = codec.serialize(&mut record).unwrap();
    assert_eq!(wire, "XX");

    let mut parsed = MapRecord::new(spec.clone());
    codec.deserialize_into(&mut parsed, "XX").unwrap();
    assert_eq!(parsed.get("body"), Some(&Value::text("X")));

    let mut parsed = MapRecord::new(spec);
    let err = codec.deserialize_into(&mut parsed, "YX").unwrap_err();
    assert!(matches!(err, CodecError::ChecksumMismatch { .. }));
}

#[test]
fn checksum_frame_followed_by_terminator() {
    let codec = Codec::new();
    let spec = RecordSpec::new("Terminated").template("<STX>~{body}<ETX>:r~!r!<CR>");
    let mut record = MapRecord::new(spec.clone()).with("body", "hello");
    let wire = codec.serialize(&mut record).unwrap();
    assert_eq!(wire, "\u{2}hello\u{3}a\r");

    let mut parsed = MapRecord::new(spec.clone());
    codec.deserialize_into(&mut parsed, &wire).unwrap();
    assert_eq!(parsed.get("body"), Some(&Value::text("hello")));

    let mut parsed = MapRecord::new(spec);
    let err = codec
        .deserialize_into(&mut parsed, "\u{2}hello\u{3}b\r")
        .unwrap_err();
    assert!(matches!(
        err,
        CodecError::ChecksumMismatch { expected: 'a', found: 'b', .. }
    ));
}

#[test]
fn repeated_pairs() {
    let codec = Codec::new();
    let mut message = ArrayMessage {
        keys: strings(&["one", "two", "three"]),
        values: strings(&["first", "second", "third"]),
    };
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, "message-data->(one:first,two:second,three:third)\r\n");
    assert_eq!(wire.matches(',').count(), 2);
    let parsed: ArrayMessage = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed, message);
}

#[test]
fn repeated_length_mismatch_is_fatal() {
    let mut message = ArrayMessage {
        keys: strings(&["one", "two"]),
        values: strings(&["first"]),
    };
    let err = Codec::new().serialize(&mut message).unwrap_err();
    assert!(matches!(err, CodecError::SequenceLengthMismatch { .. }));
}

#[test]
fn repeated_parse_replaces_earlier_elements() {
    let codec = Codec::new();
    let mut message = ArrayMessage {
        keys: strings(&["one", "two", "three"]),
        values: strings(&["first", "second", "third"]),
    };
    codec
        .deserialize_into(&mut message, "message-data->(a:1)\r\n")
        .unwrap();
    assert_eq!(message.keys, strings(&["a"]));
    assert_eq!(message.values, strings(&["1"]));

    codec
        .deserialize_into(&mut message, "message-data->()\r\n")
        .unwrap();
    assert!(message.keys.is_empty());
    assert!(message.values.is_empty());
}

#[test]
fn mega_full() {
    let codec = Codec::new();
    let mut message = Mega::new(
        &["one", "two", "three"],
        &["first", "second", "third"],
        Some(Tag::New),
        2,
    );
    let wire = codec.serialize(&mut message).unwrap();
    let expected = format!(
        "{}\\mega\\(one:first)\r\n(two:second)\r\n(three:third)\\!NEW[4]!{}",
        STX, ETX
    );
    assert_eq!(wire, expected);

    let parsed: Mega = codec.deserialize(&wire.replace("[4]", "[2]")).unwrap();
    assert_eq!(parsed.keys, Some(strings(&["one", "two", "three"])));
    assert_eq!(parsed.values, Some(strings(&["first", "second", "third"])));
    assert_eq!(parsed.tag, Some(Tag::New));
    assert_eq!(parsed.extra, 4);
}

#[test]
fn mega_without_tag() {
    let codec = Codec::new();
    let mut message = Mega::new(&["one", "two"], &["first", "second"], None, 0);
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(
        wire,
        format!("{}\\mega\\(one:first)\r\n(two:second)\\{}", STX, ETX)
    );
    let parsed: Mega = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed.keys, Some(strings(&["one", "two"])));
    assert_eq!(parsed.values, Some(strings(&["first", "second"])));
    assert_eq!(parsed.tag, None);
    assert_eq!(parsed.extra, 0);
}

#[test]
fn mega_empty() {
    let codec = Codec::new();
    let mut message = Mega::new(&[], &[], None, 0);
    let wire = codec.serialize(&mut message).unwrap();
    assert_eq!(wire, format!("{}\\mega\\\\{}", STX, ETX));
    let parsed: Mega = codec.deserialize(&wire).unwrap();
    assert_eq!(parsed.keys, None);
    assert_eq!(parsed.values, None);
    assert_eq!(parsed.tag, None);
    assert_eq!(parsed.extra, 0);
}

#[test]
fn unknown_field_is_not_absorbed_by_optional() {
    #[derive(Default)]
    struct Narrow {
        a: String,
    }
    record!(Narrow => RecordSpec::new("Narrow").template("{a}[-{b}]");
        fields { a }
    );
    let mut record = Narrow { a: "x".into() };
    let err = Codec::new().serialize(&mut record).unwrap_err();
    assert!(matches!(
        err,
        CodecError::FieldAccess(FieldError::NoSuchField { ref field, .. }) if field == "b"
    ));
}

#[test]
fn malformed_template_surfaces_compile_error() {
    let mut record = MapRecord::new(RecordSpec::new("Broken").template("a{b"));
    let err = Codec::new().serialize(&mut record).unwrap_err();
    assert!(matches!(err, CodecError::Compile(_)));
}

#[test]
fn first_matching_candidate_wins() {
    let codec = Codec::new();
    let mut message = ArrayMessage {
        keys: strings(&["k"]),
        values: strings(&["v"]),
    };
    let wire = codec.serialize(&mut message).unwrap();

    let candidates: Vec<Candidate<'_, Box<dyn Record>>> = vec![
        Candidate::boxed::<Ecc, _>("Ecc"),
        Candidate::boxed::<Mega, _>("Mega"),
        Candidate::boxed::<ArrayMessage, _>("ArrayMessage"),
    ];
    let found = codec.deserialize_any(&wire, &candidates).unwrap();
    assert_eq!(found.spec().name, "ArrayMessage");
    assert_eq!(found.read_field("keys").unwrap(), Value::from(vec!["k"]));

    let err = codec.deserialize_any("nothing", &candidates).err().unwrap();
    match err {
        CodecError::CandidatesExhausted(failures) => {
            let names: Vec<&str> = failures.iter().map(|f| f.candidate.as_str()).collect();
            assert_eq!(names, vec!["Ecc", "Mega", "ArrayMessage"]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn candidates_built_with_arguments() {
    let codec = Codec::new();
    let candidates = vec![
        Candidate::new("short", || {
            MapRecord::new(RecordSpec::new("short").template("{2:code}-{rest}"))
        }),
        Candidate::of("default"),
    ];
    let found: MapRecord = codec.deserialize_any("ab-cd", &candidates[..1]).unwrap();
    assert_eq!(found.get("code"), Some(&Value::text("ab")));
    // A default MapRecord has no template.
    let err = codec.deserialize_any("ab-cd", &candidates[1..]).unwrap_err();
    assert!(matches!(err, CodecError::CandidatesExhausted(ref f) if f.len() == 1));
}

#[test]
fn trailing_input_only_rejected_on_request() {
    let spec = RecordSpec::new("Code").template("{3:code}");
    let mut record = MapRecord::new(spec);
    Codec::new().deserialize_into(&mut record, "abcd").unwrap();
    assert_eq!(record.get("code"), Some(&Value::text("abc")));

    let strict = Codec::new().complete_parse(true);
    assert!(strict.deserialize_into(&mut record, "abc").is_ok());
    assert!(matches!(
        strict.deserialize_into(&mut record, "abcd"),
        Err(CodecError::TrailingInput { consumed: 3, total: 4 })
    ));
}

#[test]
fn compiled_template_is_shared_between_threads() {
    let template = compile("({keys}\\:{values}:,)").unwrap();
    let codec = Codec::new();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let template = &template;
                let codec = &codec;
                scope.spawn(move || {
                    let spec = RecordSpec::new("Pairs");
                    let mut record = MapRecord::new(spec)
                        .with("keys", vec![Value::text(format!("k{}", i))])
                        .with("values", vec![Value::text(format!("v{}", i))]);
                    codec.serialize_with(template, &mut record).unwrap()
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), format!("k{}:v{}", i, i));
        }
    });
}
