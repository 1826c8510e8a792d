//! Properties of stripping over generated messages and policy trees.
//!
//! Messages are generated as annotated trees and encoded by hand; the
//! policy tree is derived from the same annotations, so every generated
//! input is well-formed and every policy node matches its field's wire
//! shape.

use proptest::prelude::*;

use proto_redact::{
    ChunkedBuffer, Destination, FieldPolicy, PrivacyFilter, PrivacySpec, WireType,
};

/// One generated field payload. Field ids are positional (index + 1), so
/// ids never collide within a message and always agree with the policy.
#[derive(Clone, Debug)]
enum Payload {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Bytes(Vec<u8>),
    Message(Vec<AnnotatedField>),
}

type AnnotatedField = (Option<Destination>, Payload);

fn encode_fields(fields: &[AnnotatedField], out: &mut ChunkedBuffer) {
    for (idx, (_, payload)) in fields.iter().enumerate() {
        let id = idx as u32 + 1;
        match payload {
            Payload::Varint(v) => {
                out.write_header(id, WireType::Varint);
                out.write_varint64(*v);
            }
            Payload::Fixed64(v) => {
                out.write_header(id, WireType::Fixed64);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Payload::Fixed32(v) => {
                out.write_header(id, WireType::Fixed32);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Payload::Bytes(bytes) => {
                out.write_header(id, WireType::LengthDelimited);
                out.write_varint32(bytes.len() as u32);
                out.extend_from_slice(bytes);
            }
            Payload::Message(inner) => {
                let mut nested = ChunkedBuffer::new();
                encode_fields(inner, &mut nested);
                out.write_header(id, WireType::LengthDelimited);
                out.write_varint32(nested.len() as u32);
                out.append_buffer(&nested);
            }
        }
    }
}

fn policy_children(fields: &[AnnotatedField]) -> Vec<FieldPolicy> {
    fields
        .iter()
        .enumerate()
        .filter_map(|(idx, (dest, payload))| {
            let id = idx as u32 + 1;
            match payload {
                Payload::Message(inner) => {
                    let children = policy_children(inner);
                    if children.is_empty() {
                        dest.map(|d| FieldPolicy::opaque_message(id, d))
                    } else {
                        Some(FieldPolicy::message(id, children))
                    }
                }
                _ => dest.map(|d| FieldPolicy::leaf(id, d)),
            }
        })
        .collect()
}

fn destination() -> impl Strategy<Value = Destination> {
    prop_oneof![
        Just(Destination::Local),
        Just(Destination::Explicit),
        Just(Destination::Automatic),
    ]
}

fn annotation() -> impl Strategy<Value = Option<Destination>> {
    prop_oneof![Just(None), destination().prop_map(Some)]
}

fn payload() -> impl Strategy<Value = Payload> {
    let leaf = prop_oneof![
        any::<u64>().prop_map(Payload::Varint),
        any::<u64>().prop_map(Payload::Fixed64),
        any::<u32>().prop_map(Payload::Fixed32),
        proptest::collection::vec(any::<u8>(), 0..24).prop_map(Payload::Bytes),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        proptest::collection::vec((annotation(), inner), 0..4).prop_map(Payload::Message)
    })
}

fn message() -> impl Strategy<Value = Vec<AnnotatedField>> {
    proptest::collection::vec((annotation(), payload()), 0..5)
}

fn encode(fields: &[AnnotatedField]) -> Vec<u8> {
    let mut buf = ChunkedBuffer::new();
    encode_fields(fields, &mut buf);
    buf.to_vec()
}

proptest! {
    /// A request at the least restrictive level keeps every field, byte
    /// for byte.
    #[test]
    fn local_request_round_trips(fields in message()) {
        let input = encode(&fields);
        let root = FieldPolicy::root(policy_children(&fields));
        let filter = PrivacyFilter::new(&root, PrivacySpec::new(Destination::Local));

        prop_assert_eq!(filter.strip_bytes(&input).unwrap(), input);
    }

    /// Stripping its own output changes nothing.
    #[test]
    fn strip_is_idempotent(fields in message(), dest in destination()) {
        let input = encode(&fields);
        let root = FieldPolicy::root(policy_children(&fields));
        let filter = PrivacyFilter::new(&root, PrivacySpec::new(dest));

        let once = filter.strip_bytes(&input).unwrap();
        let twice = filter.strip_bytes(&once).unwrap();
        prop_assert_eq!(twice, once);
    }

    /// Output never grows.
    #[test]
    fn output_never_longer_than_input(fields in message(), dest in destination()) {
        let input = encode(&fields);
        let root = FieldPolicy::root(policy_children(&fields));
        let filter = PrivacyFilter::new(&root, PrivacySpec::new(dest));

        let out = filter.strip_bytes(&input).unwrap();
        prop_assert!(out.len() <= input.len());
    }

    /// Stripped output is itself well-formed: a permissive re-strip walks
    /// every field and length prefix and reproduces it exactly.
    #[test]
    fn output_is_valid_wire_format(fields in message(), dest in destination()) {
        let input = encode(&fields);
        let root = FieldPolicy::root(policy_children(&fields));
        let filter = PrivacyFilter::new(&root, PrivacySpec::new(dest));

        let out = filter.strip_bytes(&input).unwrap();
        let reread = PrivacyFilter::new(&root, PrivacySpec::new(Destination::Local))
            .strip_bytes(&out)
            .unwrap();
        prop_assert_eq!(reread, out);
    }

    /// Applying two levels in sequence matches one pass at the more
    /// restrictive level.
    #[test]
    fn sequential_levels_intersect(
        fields in message(),
        a in destination(),
        b in destination(),
    ) {
        let input = encode(&fields);
        let root = FieldPolicy::root(policy_children(&fields));

        let after_a = PrivacyFilter::new(&root, PrivacySpec::new(a))
            .strip_bytes(&input)
            .unwrap();
        let then_b = PrivacyFilter::new(&root, PrivacySpec::new(b))
            .strip_bytes(&after_a)
            .unwrap();
        let direct = PrivacyFilter::new(&root, PrivacySpec::new(a.max(b)))
            .strip_bytes(&input)
            .unwrap();
        prop_assert_eq!(then_b, direct);
    }

    /// Counters agree with the byte-level outcome.
    #[test]
    fn stats_match_output(fields in message(), dest in destination()) {
        let input = ChunkedBuffer::from_slice(&encode(&fields));
        let root = FieldPolicy::root(policy_children(&fields));
        let filter = PrivacyFilter::new(&root, PrivacySpec::new(dest));

        let out = filter.strip(&input).unwrap();
        prop_assert_eq!(out.stats.bytes_in, input.len() as u64);
        prop_assert_eq!(out.stats.bytes_out, out.buffer.len() as u64);
        prop_assert!(out.stats.fields_dropped <= out.stats.fields_seen);
    }
}
