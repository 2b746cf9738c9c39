use crate::{Error, Result, Value, MAX_DEPTH};
use num_bigint_dig::BigInt;

/// Decodes one value from the front of `input`.
///
/// Trailing bytes after the first complete value are ignored: shards are
/// zero-padded to their fixed size, so a decoded record is routinely followed
/// by padding.
pub fn decode(input: &[u8]) -> Result<Value> {
    let mut d = Decoder { input, pos: 0 };
    d.value(0)
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn peek(&self) -> Result<u8> {
        self.input.get(self.pos).copied().ok_or(Error::UnexpectedEof)
    }

    fn take(&mut self) -> Result<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::LengthOverflow)?;
        if end > self.input.len() {
            return Err(Error::UnexpectedEof);
        }
        let s = &self.input[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth >= MAX_DEPTH {
            return Err(Error::DepthExceeded(MAX_DEPTH));
        }
        match self.peek()? {
            b'0'..=b'9' => self.string(),
            b'i' => self.integer(),
            b'[' => self.list(depth),
            b'{' => self.dict(depth),
            byte => Err(Error::UnexpectedByte {
                byte,
                offset: self.pos,
            }),
        }
    }

    /// Byte string or text string: `<len>:` or `<len>"` followed by the raw
    /// bytes.
    fn string(&mut self) -> Result<Value> {
        let len = self.length()?;
        match self.take()? {
            b':' => Ok(Value::Bytes(self.take_slice(len)?.to_vec())),
            b'"' => {
                let raw = self.take_slice(len)?;
                let s = std::str::from_utf8(raw).map_err(|_| Error::InvalidUtf8)?;
                Ok(Value::Text(s.to_owned()))
            }
            byte => Err(Error::UnexpectedByte {
                byte,
                offset: self.pos - 1,
            }),
        }
    }

    fn length(&mut self) -> Result<usize> {
        let mut len: usize = 0;
        while self.peek()?.is_ascii_digit() {
            let digit = (self.take()? - b'0') as usize;
            len = len
                .checked_mul(10)
                .and_then(|l| l.checked_add(digit))
                .ok_or(Error::LengthOverflow)?;
        }
        // A length can never legitimately exceed what is left to read.
        if len > self.input.len() - self.pos {
            return Err(Error::LengthOverflow);
        }
        Ok(len)
    }

    /// `i<decimal>e`, yielding `Int` when the digits fit in an i64 and `Big`
    /// otherwise.
    fn integer(&mut self) -> Result<Value> {
        self.take()?; // 'i'
        let start = self.pos;
        if self.peek()? == b'-' {
            self.pos += 1;
        }
        while self.peek()? != b'e' {
            if !self.take()?.is_ascii_digit() {
                return Err(Error::MalformedInteger);
            }
        }
        let digits = &self.input[start..self.pos];
        self.take()?; // 'e'
        if digits.is_empty() || digits == b"-" {
            return Err(Error::MalformedInteger);
        }
        let text = std::str::from_utf8(digits).expect("ascii digits");
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        text.parse::<BigInt>()
            .map(Value::Big)
            .map_err(|_| Error::MalformedInteger)
    }

    fn list(&mut self, depth: usize) -> Result<Value> {
        self.take()?; // '['
        let mut items = Vec::new();
        while self.peek()? != b']' {
            items.push(self.value(depth + 1)?);
        }
        self.take()?; // ']'
        Ok(Value::List(items))
    }

    fn dict(&mut self, depth: usize) -> Result<Value> {
        self.take()?; // '{'
        let mut pairs = Vec::new();
        while self.peek()? != b'}' {
            let k = self.value(depth + 1)?;
            let v = self.value(depth + 1)?;
            pairs.push((k, v));
        }
        self.take()?; // '}'
        Ok(Value::Dict(pairs))
    }
}
