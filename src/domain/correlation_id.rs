use rand::Rng;

/// Number of hex characters in a correlation id unless configured otherwise.
pub const DEFAULT_HEX_LENGTH: usize = 6;

/// Opaque, URL-safe token joining a work item to its result entry.
///
/// With `L` bytes of entropy the chance of a collision among `N` in-flight
/// requests is roughly `N² / 2^(8L + 1)`. The default of 3 bytes only holds up
/// under low concurrency; raise `id_length_bytes` for busier deployments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Only even sizes are supported, {0} hex characters were requested.")]
    OddLength(usize),
    #[error("A correlation id needs at least one byte of entropy.")]
    ZeroLength,
}

/// Produces correlation ids of a fixed, even length.
///
/// The length is validated once, at construction, so that generating an id
/// on the request path can never fail.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationIdGenerator {
    length_bytes: usize,
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self {
            length_bytes: DEFAULT_HEX_LENGTH / 2,
        }
    }
}

impl CorrelationIdGenerator {
    /// Returns a generator for ids of `hex_length` characters.
    /// Hex encoding only renders whole bytes, so odd lengths are rejected.
    pub fn new(hex_length: usize) -> Result<Self, GenerationError> {
        if hex_length % 2 == 1 {
            return Err(GenerationError::OddLength(hex_length));
        }
        Self::with_length_bytes(hex_length / 2)
    }

    pub fn with_length_bytes(length_bytes: usize) -> Result<Self, GenerationError> {
        if length_bytes == 0 {
            return Err(GenerationError::ZeroLength);
        }
        Ok(Self { length_bytes })
    }

    pub fn hex_length(&self) -> usize {
        self.length_bytes * 2
    }

    pub fn generate(&self) -> CorrelationId {
        // `ThreadRng` is a CSPRNG periodically reseeded from the OS.
        let mut buf = vec![0u8; self.length_bytes];
        rand::rng().fill(&mut buf[..]);
        CorrelationId(hex::encode(buf))
    }
}
