//! Deterministic binary encoding of a fully lowered schema (spec §4.C9, §6
//! "Persisted schema").
//!
//! The wire format is a small versioned envelope — magic bytes, a format
//! version, then a `bincode` payload of the [`AirSchema`] itself — so a
//! reader can reject a file from an incompatible version before attempting
//! to deserialize it. `bincode`'s fixed-width little-endian integer encoding
//! is endian-stable by construction; the struct's field order (modules,
//! registers/declarations, assignments, then each constraint kind, then
//! assertions) is the encoding order spec.md prescribes, and since every
//! collection here is a plain `Vec` (nothing hash-ordered), encoding the
//! same schema twice always produces the same bytes.

use crate::schema::AirSchema;
use anyhow::{bail, Context, Result};
use std::path::Path;

const MAGIC: &[u8; 4] = b"AIR1";
const FORMAT_VERSION: u32 = 1;

/// Encodes a fully lowered schema to its deterministic binary form.
/// `decode(encode(s)) == s` for any schema whose term trees use only the
/// registered variants (U5).
pub fn encode_schema(schema: &AirSchema) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    let payload = bincode::serialize(schema).context("serializing schema")?;
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decodes a schema previously produced by [`encode_schema`]. After
/// decoding, the column cache needs no explicit rebuild: `Schema::columns`
/// is a pure fold over `declarations`, which round-trips with the rest of
/// the struct, so re-iterating it reproduces the cache spec.md describes.
pub fn decode_schema(bytes: &[u8]) -> Result<AirSchema> {
    if bytes.len() < 8 {
        bail!("schema blob too short to contain a header");
    }
    let (magic, rest) = bytes.split_at(4);
    if magic != MAGIC {
        bail!("not an AIR schema file (bad magic)");
    }
    let (version_bytes, payload) = rest.split_at(4);
    let version = u32::from_le_bytes(version_bytes.try_into().unwrap());
    if version != FORMAT_VERSION {
        bail!("unsupported schema format version {version} (expected {FORMAT_VERSION})");
    }
    let schema: AirSchema = bincode::deserialize(payload).context("deserializing schema")?;
    Ok(schema)
}

/// Writes an encoded schema to `path`.
pub fn save_schema(schema: &AirSchema, path: &Path) -> Result<()> {
    let bytes = encode_schema(schema)?;
    std::fs::write(path, bytes).with_context(|| format!("writing schema to {}", path.display()))?;
    Ok(())
}

/// Reads a schema previously written by [`save_schema`].
pub fn load_schema(path: &Path) -> Result<AirSchema> {
    let bytes = std::fs::read(path).with_context(|| format!("reading schema from {}", path.display()))?;
    decode_schema(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldElement;
    use crate::handle::Handle;
    use crate::schema::{Domain, HirSchema};
    use crate::term::HirTerm;
    use crate::types::DataType;

    fn sample_air_schema() -> AirSchema {
        let mut hir: HirSchema = HirSchema::new();
        let m = hir.add_module("m");
        let x = hir.add_data_column(m, "x", DataType::Uint(1), false).unwrap();
        let body = HirTerm::mul([HirTerm::column(x), HirTerm::sub([HirTerm::column(x), HirTerm::one()])]);
        hir.add_vanishing_constraint(Handle::new("m", "c"), None, Domain::AllRows, body).unwrap();
        let mir = crate::lower::lower_hir_to_mir(&hir).unwrap();
        crate::lower::lower_mir_to_air(&mir).unwrap()
    }

    #[test]
    fn round_trips_a_lowered_schema() {
        let schema = sample_air_schema();
        let bytes = encode_schema(&schema).unwrap();
        let decoded = decode_schema(&bytes).unwrap();
        assert_eq!(decoded.modules.len(), schema.modules.len());
        assert_eq!(decoded.registers.len(), schema.registers.len());
        assert_eq!(decoded.vanishing.len(), schema.vanishing.len());
        assert_eq!(decoded.columns().collect::<Vec<_>>(), schema.columns().collect::<Vec<_>>());
    }

    #[test]
    fn encoding_is_deterministic() {
        let schema = sample_air_schema();
        assert_eq!(encode_schema(&schema).unwrap(), encode_schema(&schema).unwrap());
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 16];
        assert!(decode_schema(&bytes).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&999u32.to_le_bytes());
        bytes.extend_from_slice(&bincode::serialize(&FieldElement::zero()).unwrap());
        assert!(decode_schema(&bytes).is_err());
    }
}
