// Request builders for edit programs and row schemas

use lexport::driver::codec::Encoder;

/// Builder for an edit program (terminated by STOP on encode)
#[derive(Debug, Clone, Default)]
pub struct Edit {
    bytes: Encoder,
}

#[allow(dead_code)] // Each test binary uses a subset
impl Edit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stemmer(mut self, language: &str) -> Self {
        self.bytes.write_u8(1);
        self.bytes.write_string(language);
        self
    }

    pub fn data(mut self, data: &[u8]) -> Self {
        self.bytes.write_u8(2);
        self.bytes.write_bytes(data);
        self
    }

    pub fn text(mut self, text: &str, wdf_inc: u32, prefix: &str) -> Self {
        self.bytes.write_u8(4);
        self.bytes.write_string(text);
        self.bytes.write_u32(wdf_inc);
        self.bytes.write_string(prefix);
        self
    }

    fn term_op(mut self, tag: u8, term: &str, wdf: u32, ignore: bool) -> Self {
        self.bytes.write_u8(tag);
        self.bytes.write_string(term);
        self.bytes.write_u32(wdf);
        self.bytes.write_bool(ignore);
        self
    }

    pub fn set_term(self, term: &str, wdf: u32) -> Self {
        self.term_op(5, term, wdf, false)
    }

    pub fn add_term(self, term: &str, wdf: u32) -> Self {
        self.term_op(6, term, wdf, false)
    }

    pub fn remove_term(self, term: &str, ignore: bool) -> Self {
        self.term_op(8, term, 0, ignore)
    }

    pub fn set_wdf(self, term: &str, wdf: u32) -> Self {
        self.term_op(13, term, wdf, false)
    }

    pub fn dec_wdf(self, term: &str, delta: u32) -> Self {
        self.term_op(14, term, delta, false)
    }

    /// ADD_VALUE with a string value
    pub fn add_value(mut self, slot: u32, value: &str) -> Self {
        self.bytes.write_u8(9);
        self.bytes.write_u32(slot);
        self.bytes.write_u8(0);
        self.bytes.write_string(value);
        self.bytes.write_bool(false);
        self
    }

    /// SET_VALUE with a double, stored in sortable form
    pub fn set_float(mut self, slot: u32, value: f64) -> Self {
        self.bytes.write_u8(10);
        self.bytes.write_u32(slot);
        self.bytes.write_u8(1);
        self.bytes.write_f64(value);
        self.bytes.write_bool(false);
        self
    }

    /// SET_POSTING
    pub fn posting(mut self, term: &str, pos: u32, wdf: u32) -> Self {
        self.bytes.write_u8(15);
        self.bytes.write_string(term);
        self.bytes.write_u32(pos);
        self.bytes.write_u32(wdf);
        self.bytes.write_bool(false);
        self
    }

    pub fn encode(&self, e: &mut Encoder) {
        for &b in self.bytes.as_bytes() {
            e.write_u8(b);
        }
        e.write_u8(0);
    }
}

/// Builder for a document schema (decoder kind plus field commands)
#[derive(Debug, Clone)]
pub struct Schema {
    decoder: u8,
    fields: Vec<(u8, Option<u32>)>,
}

#[allow(dead_code)] // Each test binary uses a subset
impl Schema {
    pub const DOCUMENT: u8 = 0;
    pub const ITERATOR: u8 = 1;
    pub const BOTH: u8 = 2;

    pub fn new(decoder: u8) -> Self {
        Self {
            decoder,
            fields: Vec::new(),
        }
    }

    pub fn value(mut self, slot: u32) -> Self {
        self.fields.push((1, Some(slot)));
        self
    }

    pub fn data(mut self) -> Self {
        self.fields.push((2, None));
        self
    }

    pub fn docid(mut self) -> Self {
        self.fields.push((3, None));
        self
    }

    pub fn weight(mut self) -> Self {
        self.fields.push((4, None));
        self
    }

    pub fn rank(mut self) -> Self {
        self.fields.push((5, None));
        self
    }

    pub fn multi_docid(mut self) -> Self {
        self.fields.push((8, None));
        self
    }

    pub fn db_number(mut self) -> Self {
        self.fields.push((9, None));
        self
    }

    pub fn encode(&self, e: &mut Encoder) {
        e.write_u8(self.decoder);
        for &(field, slot) in &self.fields {
            e.write_u8(field);
            if let Some(slot) = slot {
                e.write_u32(slot);
            }
        }
        e.write_u8(0);
    }
}

/// Encode a term schema: TERM_VALUE, TERM_WDF, TERM_FREQ, TERM_POSITIONS
#[allow(dead_code)]
pub fn full_term_schema(e: &mut Encoder) {
    for field in [1, 2, 3, 5] {
        e.write_u8(field);
    }
    e.write_u8(0);
}
