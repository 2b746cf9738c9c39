use crate::Value;

/// Encodes a value to its canonical byte form.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

/// Encodes a value, appending to an existing buffer.
pub fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Bytes(b) => {
            out.extend_from_slice(b.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(b);
        }
        Value::Text(s) => {
            out.extend_from_slice(s.len().to_string().as_bytes());
            out.push(b'"');
            out.extend_from_slice(s.as_bytes());
        }
        Value::Int(i) => {
            out.push(b'i');
            out.extend_from_slice(i.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Big(b) => {
            out.push(b'i');
            out.extend_from_slice(b.to_string().as_bytes());
            out.push(b'e');
        }
        Value::List(items) => {
            out.push(b'[');
            for item in items {
                encode_into(item, out);
            }
            out.push(b']');
        }
        Value::Dict(pairs) => {
            out.push(b'{');
            for (k, v) in pairs {
                encode_into(k, out);
                encode_into(v, out);
            }
            out.push(b'}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint_dig::BigInt;

    #[test]
    fn encode_atoms() {
        assert_eq!(encode(&Value::from("history")), b"7\"history");
        assert_eq!(encode(&Value::from(b"sig1".as_slice())), b"4:sig1");
        assert_eq!(encode(&Value::Int(0)), b"i0e");
        assert_eq!(encode(&Value::Int(-5)), b"i-5e");
        assert_eq!(encode(&Value::Int(32768)), b"i32768e");
    }

    #[test]
    fn encode_big_matches_int_form() {
        // Small values must encode identically regardless of integer shape.
        assert_eq!(encode(&Value::Big(BigInt::from(65537))), b"i65537e");
    }

    #[test]
    fn encode_empty_list() {
        assert_eq!(encode(&Value::List(vec![])), b"[]");
    }

    #[test]
    fn encode_nested_list() {
        let v = Value::List(vec![
            Value::from("raw"),
            Value::from(b"hello".as_slice()),
        ]);
        assert_eq!(encode(&v), b"[3\"raw5:hello]");
    }

    #[test]
    fn encode_dict_preserves_pair_order() {
        // Writer order, not sorted order: "n" deliberately precedes "e".
        let v = Value::Dict(vec![
            (Value::from("n"), Value::Int(77)),
            (Value::from("e"), Value::Int(3)),
        ]);
        assert_eq!(encode(&v), b"{1\"ni77e1\"ei3e}");
    }

    #[test]
    fn encode_revision_vector() {
        let rev = Value::List(vec![
            Value::from("revision"),
            Value::Int(0),
            Value::from(b"12".as_slice()),
            Value::from(b"333".as_slice()),
        ]);
        assert_eq!(encode(&rev), b"[8\"revisioni0e2:123:333]");
    }
}
