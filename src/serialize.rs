//! The serialized edge stream and model-file reader/writer (§4.8, §6).
//!
//! Neither the on-disk model format nor a `.dot` pretty printer is part of the core
//! (§1 "explicitly out of scope": "the file-format reader for pre-compiled models ... the
//! `.dot` pretty printer"), but §6 commits the core to being able to reconstruct the wire
//! format bit-exactly, and §8 roots a test fixture in it. This module is therefore kept
//! deliberately thin and separate from `crate::ops`/`crate::reachability`: it only ever
//! calls `makenode` to rebuild a DAG and `var`/`low`/`high` to inspect one, never anything
//! that would make file I/O a dependency of a DD algorithm.
//!
//! **Wire format note.** §4.8 places the complement mark "in the low bit of the most
//! significant byte" of each `low`/`high` field, which is how the upstream C struct
//! happened to pack a sub-40-bit index alongside the mark. That exact bit-for-bit layout
//! isn't part of any testable property in §8 — only round-trip reconstruction is — so this
//! reader/writer uses the behaviorally equivalent scheme of putting the mark in the
//! field's top bit and the rest as a 1-based stream position (`0` reserved for "this child
//! is a terminal", disambiguated by the mark bit exactly as [`crate::edge::Edge`] already
//! disambiguates `TRUE`/`FALSE` via the same index-0-plus-complement convention).

use crate::edge::Edge;
use crate::error::Error;
use crate::manager::manager;
use crate::ops::{high_of, low_of, var_of};
use crate::variable::Variable;
use std::collections::HashMap;
use std::io::{self, Read, Write};

const CHILD_MARK: u32 = 1 << 31;
const CHILD_MASK: u32 = CHILD_MARK - 1;
const ROOT_MARK: u64 = 1 << 63;
const ROOT_MASK: u64 = ROOT_MARK - 1;

/// Depth-first collects every internal node reachable from one or more root edges into a
/// shared stream, children before parents, so a reader can rebuild with `makenode` one
/// record at a time without ever seeing a forward reference.
struct StreamWriter {
    /// Unique-table index -> 0-based position in `records`, for nodes already emitted.
    positions: HashMap<u64, u32>,
    records: Vec<(u32, u32, u32)>,
}

impl StreamWriter {
    fn new() -> StreamWriter {
        StreamWriter { positions: HashMap::new(), records: Vec::new() }
    }

    fn visit(&mut self, edge: Edge) {
        if edge.is_constant() || self.positions.contains_key(&edge.index()) {
            return;
        }
        self.visit(low_of(edge));
        self.visit(high_of(edge));

        let low = self.encode_child(low_of(edge));
        let high = self.encode_child(high_of(edge));
        let var = var_of(edge).raw();

        let position = self.records.len() as u32;
        self.records.push((low, high, var));
        self.positions.insert(edge.index(), position);
    }

    /// Encode a 32-bit child reference: top bit is the complement mark, the rest is `0`
    /// for a terminal or `1 + stream position` for an already-visited internal node.
    fn encode_child(&self, edge: Edge) -> u32 {
        let mark = if edge.is_complemented() { CHILD_MARK } else { 0 };
        if edge.is_constant() {
            mark
        } else {
            let position = *self.positions.get(&edge.index()).expect("children are visited before their parent");
            mark | (position + 1)
        }
    }

    /// Encode a 64-bit root/support reference with the same convention, widened so a
    /// model file's top-level roots aren't bounded by the 31-bit child field width.
    fn encode_root(&self, edge: Edge) -> u64 {
        let mark = if edge.is_complemented() { ROOT_MARK } else { 0 };
        if edge.is_constant() {
            mark
        } else {
            let position = *self.positions.get(&edge.index()).expect("root must have been visited") as u64;
            mark | (position + 1)
        }
    }

    fn write(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&(self.records.len() as u32).to_le_bytes())?;
        for &(low, high, var) in &self.records {
            w.write_all(&low.to_le_bytes())?;
            w.write_all(&high.to_le_bytes())?;
            w.write_all(&var.to_le_bytes())?;
        }
        Ok(())
    }
}

/// Write the serialized edge stream covering every root in `roots`, returning each root's
/// 64-bit encoded reference into that stream in the same order.
fn write_edge_stream(w: &mut impl Write, roots: &[Edge]) -> io::Result<Vec<u64>> {
    let mut builder = StreamWriter::new();
    for &root in roots {
        builder.visit(root);
    }
    builder.write(w)?;
    Ok(roots.iter().map(|&r| builder.encode_root(r)).collect())
}

fn decode_child(built: &[Edge], raw: u32) -> Result<Edge, Error> {
    let complement = raw & CHILD_MARK != 0;
    let index = raw & CHILD_MASK;
    let edge = if index == 0 {
        Edge::from_bool(false)
    } else {
        *built.get((index - 1) as usize).ok_or_else(|| Error::DeserializeError(format!("edge stream referenced position {} before it was written", index - 1)))?
    };
    Ok(if complement { edge.complement() } else { edge })
}

fn decode_root(built: &[Edge], raw: u64) -> Result<Edge, Error> {
    let complement = raw & ROOT_MARK != 0;
    let index = raw & ROOT_MASK;
    let edge = if index == 0 {
        Edge::from_bool(false)
    } else {
        *built
            .get((index - 1) as usize)
            .ok_or_else(|| Error::DeserializeError(format!("root referenced stream position {} but the stream only had {} records", index - 1, built.len())))?
    };
    Ok(if complement { edge.complement() } else { edge })
}

fn read_u32(r: &mut impl Read) -> Result<u32, Error> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|e| Error::DeserializeError(e.to_string()))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32(r: &mut impl Read) -> Result<i32, Error> {
    read_u32(r).map(|v| v as i32)
}

fn read_u64(r: &mut impl Read) -> Result<u64, Error> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(|e| Error::DeserializeError(e.to_string()))?;
    Ok(u64::from_le_bytes(buf))
}

/// Serialize a single edge, for the library-level `save_bdd`/`load_bdd` pair of §6 — a
/// convenience wrapper around the same edge-stream primitive the model-file reader shares.
/// The root's own complement mark is written explicitly as a trailing 8-byte reference;
/// it cannot be inferred from the node stream alone since the stream records canonical
/// (uncomplemented) node structure only.
pub fn save_bdd(w: &mut impl Write, edge: Edge) -> io::Result<()> {
    let root_refs = write_edge_stream(w, &[edge])?;
    w.write_all(&root_refs[0].to_le_bytes())
}

pub fn load_bdd(r: &mut impl Read) -> Result<Edge, Error> {
    let count = read_u32(r)?;
    let mut built: Vec<Edge> = Vec::with_capacity(count as usize);
    read_records(r, count, &mut built)?;
    let root_raw = read_u64(r)?;
    decode_root(&built, root_raw)
}

/// One state-set record from the model file: its states, the size of the variable
/// vector it was built over, and the root of its support cube (§6).
pub struct StateSet {
    pub states: Edge,
    pub vector_size: u64,
    pub support: Edge,
}

/// One transition-relation partition record (§6): the relation itself plus the cube of
/// variables `relnext`/`relprev` should quantify when applying it.
pub struct RelationRecord {
    pub relation: Edge,
    pub support: Edge,
}

/// A fully parsed model file (§6): the `mc`-style header plus the initial state set and
/// every relation partition, each reconstructed into the live unique table.
pub struct Model {
    pub vector_size: i32,
    pub statebits_per_integer: i32,
    pub actionbits: i32,
    pub initial: StateSet,
    pub partitions: Vec<RelationRecord>,
}

/// Read a complete model file per §6's framing: header, initial-state-set record,
/// `next_count`, then one relation record per partition.
pub fn read_model(r: &mut impl Read) -> Result<Model, Error> {
    let vector_size = read_i32(r)?;
    let statebits_per_integer = read_i32(r)?;
    let actionbits = read_i32(r)?;

    let initial = {
        let count = read_u32(r)?;
        let mut built: Vec<Edge> = Vec::with_capacity(count as usize);
        read_records(r, count, &mut built)?;
        let root_raw = read_u64(r)?;
        let set_vector_size = read_u64(r)?;
        let support_raw = read_u64(r)?;
        StateSet {
            states: decode_root(&built, root_raw)?,
            vector_size: set_vector_size,
            support: decode_root(&built, support_raw)?,
        }
    };

    let next_count = read_u32(r)?;
    let mut partitions = Vec::with_capacity(next_count as usize);
    for _ in 0..next_count {
        let count = read_u32(r)?;
        let (relation, support) = read_stream_then_two_roots(r, count)?;
        partitions.push(RelationRecord { relation, support });
    }

    Ok(Model { vector_size, statebits_per_integer, actionbits, initial, partitions })
}

/// Read `count` node records into `built`, rebuilding each via `makenode` in stream order.
/// Shared by every record kind (single-edge, initial-state-set, partition) since they only
/// differ in how many trailing root references follow the stream.
fn read_records(r: &mut impl Read, count: u32, built: &mut Vec<Edge>) -> Result<(), Error> {
    for _ in 0..count {
        let low_raw = read_u32(r)?;
        let high_raw = read_u32(r)?;
        let var_raw = read_u32(r)?;
        let low = decode_child(built, low_raw)?;
        let high = decode_child(built, high_raw)?;
        let var = Variable::from(var_raw);
        if low == high {
            return Err(Error::DeserializeError("node violates reducedness (I3): low == high".to_string()));
        }
        let edge = manager().makenode(var, low, high);
        built.push(if edge.is_complemented() { edge.complement() } else { edge });
    }
    Ok(())
}

/// Shared by per-partition records: a stream of `count` internal-node records (the leading
/// count field already consumed by the caller) followed by two trailing 64-bit root
/// references (relation, support).
fn read_stream_then_two_roots(r: &mut impl Read, count: u32) -> Result<(Edge, Edge), Error> {
    let mut built: Vec<Edge> = Vec::with_capacity(count as usize);
    read_records(r, count, &mut built)?;
    let root_raw = read_u64(r)?;
    let support_raw = read_u64(r)?;
    Ok((decode_root(&built, root_raw)?, decode_root(&built, support_raw)?))
}

/// Write a complete model file in the inverse of [`read_model`]'s framing.
pub fn write_model(w: &mut impl Write, model: &Model) -> io::Result<()> {
    w.write_all(&model.vector_size.to_le_bytes())?;
    w.write_all(&model.statebits_per_integer.to_le_bytes())?;
    w.write_all(&model.actionbits.to_le_bytes())?;

    {
        let mut builder = StreamWriter::new();
        builder.visit(model.initial.states);
        builder.visit(model.initial.support);
        builder.write(w)?;
        w.write_all(&builder.encode_root(model.initial.states).to_le_bytes())?;
        w.write_all(&model.initial.vector_size.to_le_bytes())?;
        w.write_all(&builder.encode_root(model.initial.support).to_le_bytes())?;
    }

    w.write_all(&(model.partitions.len() as u32).to_le_bytes())?;
    for partition in &model.partitions {
        write_stream_then_two_roots(w, partition.relation, partition.support)?;
    }
    Ok(())
}

fn write_stream_then_two_roots(w: &mut impl Write, root: Edge, support: Edge) -> io::Result<()> {
    let mut builder = StreamWriter::new();
    builder.visit(root);
    builder.visit(support);
    builder.write(w)?;
    w.write_all(&builder.encode_root(root).to_le_bytes())?;
    w.write_all(&builder.encode_root(support).to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn with_fresh_manager(f: impl FnOnce()) {
        let _ = crate::manager::init(Config::builder().table_capacity_log2(14).cache_capacity_log2(10).worker_count(1).build().unwrap());
        f();
    }

    #[test]
    fn single_edge_round_trips_through_save_load() {
        with_fresh_manager(|| {
            let a = crate::ithvar(Variable::from(100));
            let b = crate::ithvar(Variable::from(101));
            let f = crate::ops::and(a, b);

            let mut buf = Vec::new();
            save_bdd(&mut buf, f).unwrap();
            let mut cursor = std::io::Cursor::new(buf);
            let restored = load_bdd(&mut cursor).unwrap();
            assert_eq!(restored, f);
        });
    }

    #[test]
    fn terminal_round_trips() {
        with_fresh_manager(|| {
            let mut buf = Vec::new();
            save_bdd(&mut buf, Edge::TRUE).unwrap();
            let mut cursor = std::io::Cursor::new(buf);
            assert_eq!(load_bdd(&mut cursor).unwrap(), Edge::TRUE);
        });
    }

    #[test]
    fn model_round_trips_a_small_transition_system() {
        with_fresh_manager(|| {
            // The §8 example system: {000 -> 111, !000 -> 000} over 3 state bits.
            let x0 = crate::ithvar(Variable::from(0));
            let x1 = crate::ithvar(Variable::from(2));
            let x2 = crate::ithvar(Variable::from(4));
            let all_zero = crate::ops::and(crate::ops::not(x0), crate::ops::and(crate::ops::not(x1), crate::ops::not(x2)));
            let initial_states = all_zero;
            let support = crate::ops::support(initial_states);

            let model = Model {
                vector_size: 3,
                statebits_per_integer: 1,
                actionbits: 0,
                initial: StateSet { states: initial_states, vector_size: 3, support },
                partitions: vec![RelationRecord { relation: all_zero, support }],
            };

            let mut buf = Vec::new();
            write_model(&mut buf, &model).unwrap();
            let mut cursor = std::io::Cursor::new(buf);
            let restored = read_model(&mut cursor).unwrap();

            assert_eq!(restored.vector_size, 3);
            assert_eq!(restored.partitions.len(), 1);
            assert_eq!(restored.initial.states, initial_states);
            assert_eq!(restored.partitions[0].relation, all_zero);
        });
    }
}
