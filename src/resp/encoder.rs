use bytes::{BufMut, BytesMut};

use crate::command::{Command, Item};

/// Serializes a command onto the wire.
///
/// Honors `inline_hint` without second-guessing it: the caller (the
/// command-catalog layer, out of scope here) is responsible for only
/// requesting inline form for arguments known to contain no whitespace or
/// CR/LF. If the hint can't actually be satisfied inline (any argument is
/// binary bytes, contains whitespace, or the command is empty), array form
/// is used instead (a safety net, not a policy override).
pub fn encode(cmd: &Command, inline_hint: bool) -> BytesMut {
    if inline_hint && can_inline(cmd) {
        encode_inline(cmd)
    } else {
        encode_array(cmd)
    }
}

fn can_inline(cmd: &Command) -> bool {
    !cmd.items.is_empty()
        && cmd.items.iter().all(|item| match item {
            Item::Text(s) => !s.is_empty() && !s.bytes().any(|b| is_inline_unsafe(b)),
            Item::Bytes(_) => false,
        })
}

fn is_inline_unsafe(b: u8) -> bool {
    b == b' ' || b == b'\r' || b == b'\n' || b == b'\t'
}

fn encode_inline(cmd: &Command) -> BytesMut {
    let mut buf = BytesMut::new();
    for (i, item) in cmd.items.iter().enumerate() {
        if i > 0 {
            buf.put_u8(b' ');
        }
        match item {
            Item::Text(s) => buf.put_slice(s.as_bytes()),
            Item::Bytes(_) => unreachable!("can_inline rejects binary arguments"),
        }
    }
    buf.put_slice(b"\r\n");
    buf
}

fn encode_array(cmd: &Command) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.put_slice(format!("*{}\r\n", cmd.items.len()).as_bytes());
    for item in &cmd.items {
        let bytes: &[u8] = match item {
            Item::Text(s) => s.as_bytes(),
            Item::Bytes(b) => b.as_ref(),
        };
        buf.put_slice(format!("${}\r\n", bytes.len()).as_bytes());
        buf.put_slice(bytes);
        buf.put_slice(b"\r\n");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn inline_form_for_small_text_command() {
        let cmd = Command::new(vec![Item::text("SET"), Item::text("k"), Item::text("v")]);
        let out = encode(&cmd, true);
        assert_eq!(&out[..], b"SET k v\r\n");
    }

    #[test]
    fn array_form_when_hint_is_false() {
        let cmd = Command::new(vec![Item::text("GET"), Item::text("k")]);
        let out = encode(&cmd, false);
        assert_eq!(&out[..], b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n");
    }

    #[test]
    fn array_form_forced_for_binary_argument_even_with_inline_hint() {
        let cmd = Command::new(vec![
            Item::text("SET"),
            Item::text("big"),
            Item::Bytes(Bytes::from_static(b"\x00\x01\x02")),
        ]);
        let out = encode(&cmd, true);
        assert_eq!(
            &out[..],
            b"*3\r\n$3\r\nSET\r\n$3\r\nbig\r\n$3\r\n\x00\x01\x02\r\n"
        );
    }

    #[test]
    fn array_form_forced_when_text_contains_whitespace() {
        let cmd = Command::new(vec![Item::text("SET"), Item::text("k"), Item::text("v v")]);
        let out = encode(&cmd, true);
        assert_eq!(&out[..], b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$3\r\nv v\r\n");
    }
}
