/// A git blob — raw file content. Identity bytes in, identity bytes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Parse blob payload. A blob is simply its raw bytes.
    pub fn parse(payload: &[u8]) -> Self {
        Self {
            data: payload.to_vec(),
        }
    }

    pub fn serialize(&self) -> &[u8] {
        &self.data
    }
}
