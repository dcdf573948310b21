//! The decode table.
//!
//! Built once from a catalog: a 256-entry node per opcode byte position,
//! each slot holding nothing (invalid opcode), the single operation the
//! bytes so far identify, or a nested node for the next byte. Decoding an
//! instruction is then one array index per byte.

use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use crate::catalog::{CATALOG, GenericOperation};
use crate::error::{ByteTrace, CatalogError};
use crate::fetcher::CodeFetcher;
use crate::functions::{Function, Template};
use crate::pattern::{MAX_BYTES, Pattern};

/// What to do when two catalog entries match the same complete byte
/// sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Keep the entry declared first, log a warning and record the
    /// collision.
    #[default]
    FirstDeclared,
    /// Fail the build.
    Reject,
}

/// A tie-break taken while building the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// The complete byte sequence both entries match.
    pub bytes: Vec<u8>,
    /// The entry that was kept.
    pub chosen: &'static str,
    /// The entries that were discarded, in declaration order.
    pub discarded: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Empty,
    Leaf(usize),
    Nested(Box<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    slots: Vec<Slot>,
}

/// A catalog entry with its pattern and mnemonic compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Compiled {
    pub(crate) pattern: Pattern,
    pub(crate) template: Arc<Template<'static>>,
    constraints: Vec<(u8, Function)>,
}

/// Byte-indexed decoder for a catalog.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    catalog: &'static [GenericOperation],
    compiled: Vec<Compiled>,
    root: Node,
    collisions: Vec<Collision>,
}

impl DecodeTable {
    /// Build with the default collision policy.
    pub fn build(catalog: &'static [GenericOperation]) -> Result<Self, CatalogError> {
        Self::build_with(catalog, CollisionPolicy::default())
    }

    pub fn build_with(
        catalog: &'static [GenericOperation],
        policy: CollisionPolicy,
    ) -> Result<Self, CatalogError> {
        let compiled = catalog
            .iter()
            .map(compile)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = Builder {
            catalog,
            compiled: &compiled,
            policy,
            collisions: Vec::new(),
            nodes: 0,
        };
        let candidates: Vec<usize> = (0..catalog.len()).collect();
        let mut prefix = Vec::with_capacity(MAX_BYTES);
        let root = builder.node(&mut prefix, &candidates)?;

        debug!(
            "decode table: {} operations, {} nodes, {} collisions",
            catalog.len(),
            builder.nodes,
            builder.collisions.len()
        );

        let collisions = builder.collisions;
        Ok(Self {
            catalog,
            compiled,
            root,
            collisions,
        })
    }

    /// The table for the built-in catalog, built on first use and shared.
    ///
    /// # Panics
    ///
    /// If the built-in catalog is malformed. Its unit tests rule that out.
    #[must_use]
    pub fn standard() -> Arc<Self> {
        static STANDARD: OnceLock<Arc<DecodeTable>> = OnceLock::new();
        STANDARD
            .get_or_init(|| {
                Arc::new(Self::build(CATALOG).expect("built-in catalog is well-formed"))
            })
            .clone()
    }

    #[must_use]
    pub fn catalog(&self) -> &'static [GenericOperation] {
        self.catalog
    }

    /// Every tie-break taken during the build.
    #[must_use]
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// Compiled pattern of the catalog entry at `index`.
    #[must_use]
    pub fn pattern(&self, index: usize) -> Option<&Pattern> {
        self.compiled.get(index).map(|c| &c.pattern)
    }

    /// Walk the table with bytes from `fetcher`.
    ///
    /// Returns the index of the matching catalog entry, or `None` if the
    /// bytes are not a valid instruction. Either way the fetcher holds the
    /// bytes consumed.
    pub fn lookup_index<F: CodeFetcher + ?Sized>(&self, fetcher: &mut F) -> Option<usize> {
        let mut node = &self.root;
        loop {
            let byte = fetcher.fetch_next_byte();
            match &node.slots[usize::from(byte)] {
                Slot::Empty => return None,
                Slot::Leaf(index) => return Some(*index),
                Slot::Nested(next) => node = next,
            }
        }
    }

    /// Walk the table and return the matching operation with its pattern.
    pub fn lookup<F: CodeFetcher + ?Sized>(
        &self,
        fetcher: &mut F,
    ) -> Option<(&'static GenericOperation, &Pattern)> {
        let (generic, compiled) = self.lookup_compiled(fetcher)?;
        Some((generic, &compiled.pattern))
    }

    pub(crate) fn lookup_compiled<F: CodeFetcher + ?Sized>(
        &self,
        fetcher: &mut F,
    ) -> Option<(&'static GenericOperation, &Compiled)> {
        let index = self.lookup_index(fetcher)?;
        Some((&self.catalog[index], &self.compiled[index]))
    }
}

impl PartialEq for DecodeTable {
    fn eq(&self, other: &Self) -> bool {
        self.catalog == other.catalog
            && self.root == other.root
            && self.collisions == other.collisions
    }
}

impl Eq for DecodeTable {}

fn compile(op: &GenericOperation) -> Result<Compiled, CatalogError> {
    let pattern = Pattern::parse(op.pattern)?;
    let template: Template<'static> = Template::parse(op.mnemonic)?;
    let constraints: Vec<(u8, Function)> = template.constraints().collect();

    for &(field, _) in &constraints {
        let letter = char::from(b'a' + field);
        if pattern.field_width(letter) == 0 {
            return Err(CatalogError::UnboundField {
                mnemonic: op.mnemonic.to_string(),
                field: letter,
            });
        }
    }

    Ok(Compiled {
        pattern,
        template: Arc::new(template),
        constraints,
    })
}

struct Builder<'a> {
    catalog: &'static [GenericOperation],
    compiled: &'a [Compiled],
    policy: CollisionPolicy,
    collisions: Vec<Collision>,
    nodes: usize,
}

impl Builder<'_> {
    /// Build the node for the byte after `prefix`, considering only the
    /// entries that matched `prefix`.
    fn node(&mut self, prefix: &mut Vec<u8>, candidates: &[usize]) -> Result<Node, CatalogError> {
        self.nodes += 1;
        let mut slots = Vec::with_capacity(256);

        for byte in 0..=255u8 {
            prefix.push(byte);
            let matches: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&i| {
                    let c = &self.compiled[i];
                    c.pattern.might_match(prefix.as_slice(), &c.constraints)
                })
                .collect();

            let slot = match matches.as_slice() {
                [] => Slot::Empty,
                [only] => Slot::Leaf(*only),
                [first, rest @ ..]
                    if prefix.len() >= MAX_BYTES
                        || matches
                            .iter()
                            .all(|&i| self.compiled[i].pattern.len() <= prefix.len()) =>
                {
                    self.collide(prefix.as_slice(), *first, rest)?;
                    Slot::Leaf(*first)
                }
                _ => Slot::Nested(Box::new(self.node(prefix, &matches)?)),
            };
            slots.push(slot);
            prefix.pop();
        }

        Ok(Node { slots })
    }

    fn collide(&mut self, prefix: &[u8], first: usize, rest: &[usize]) -> Result<(), CatalogError> {
        let chosen = self.catalog[first].mnemonic;
        let discarded: Vec<&'static str> = rest.iter().map(|&i| self.catalog[i].mnemonic).collect();

        if self.policy == CollisionPolicy::Reject {
            return Err(CatalogError::Collision {
                first: chosen,
                second: discarded[0],
                bytes: ByteTrace(prefix.to_vec()),
            });
        }

        warn!(
            "decode collision at {}: keeping {chosen:?} over {discarded:?}",
            ByteTrace(prefix.to_vec())
        );
        self.collisions.push(Collision {
            bytes: prefix.to_vec(),
            chosen,
            discarded,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OpKind;
    use crate::fetcher::{BusDataFetcher, SliceFetcher};

    fn mnemonic_of(table: &DecodeTable, data: &[u8]) -> Option<&'static str> {
        let mut fetcher = SliceFetcher::new(data);
        table.lookup(&mut fetcher).map(|(op, _)| op.mnemonic)
    }

    #[test]
    fn standard_catalog_has_no_collisions() {
        let table = DecodeTable::standard();
        assert!(table.collisions().is_empty(), "{:?}", table.collisions());
    }

    #[test]
    fn holes_prune_encodings() {
        let table = DecodeTable::standard();
        assert_eq!(mnemonic_of(&table, &[0x76]), Some("HALT"));
        assert_eq!(mnemonic_of(&table, &[0x7E]), Some(r"LD \R[r],(HL)"));
        assert_eq!(mnemonic_of(&table, &[0x36, 0x00]), Some(r"LD (HL),\N[n]"));
        // SLL is undocumented.
        assert_eq!(mnemonic_of(&table, &[0xCB, 0x30]), None);
        // IM 0/1 is undocumented.
        assert_eq!(mnemonic_of(&table, &[0xED, 0x4E]), None);
    }

    #[test]
    fn index_prefixes_nest() {
        let table = DecodeTable::standard();
        assert_eq!(
            mnemonic_of(&table, &[0xFD, 0xCB, 0x02, 0x46]),
            Some(r"BIT \BIT[b],(\IDX[x]\D[d])")
        );
        assert_eq!(mnemonic_of(&table, &[0xDD, 0xE9]), Some(r"JP (\IDX[x])"));
        assert_eq!(mnemonic_of(&table, &[0xDD, 0x00]), None);
    }

    #[test]
    fn invalid_opcode_reports_consumed_bytes() {
        let table = DecodeTable::standard();
        let mut fetcher = SliceFetcher::new([0xED, 0x00]);
        assert!(table.lookup(&mut fetcher).is_none());
        assert_eq!(fetcher.consumed(), &[0xED, 0x00]);
    }

    #[test]
    fn bus_data_decodes_restart() {
        let table = DecodeTable::standard();
        let mut fetcher = BusDataFetcher::new(0xFF);
        let (op, _) = table.lookup(&mut fetcher).unwrap();
        assert_eq!(op.kind, OpKind::Rst);
    }

    static BAD_PATTERN: [GenericOperation; 1] =
        [GenericOperation::new("NOP", "0000000", 4, OpKind::Nop)];

    static UNBOUND: [GenericOperation; 1] =
        [GenericOperation::new(r"LD \R[r],A", "00000000", 4, OpKind::Nop)];

    static CLOSE_BEFORE_OPEN: [GenericOperation; 1] =
        [GenericOperation::new(r"X \N]n[", "nnnnnnnn", 4, OpKind::Nop)];

    #[test]
    fn malformed_catalogs_are_rejected() {
        assert!(matches!(
            DecodeTable::build(&BAD_PATTERN),
            Err(CatalogError::PartialByte { .. })
        ));
        assert!(matches!(
            DecodeTable::build(&UNBOUND),
            Err(CatalogError::UnboundField { field: 'r', .. })
        ));
        assert!(matches!(
            DecodeTable::build(&CLOSE_BEFORE_OPEN),
            Err(CatalogError::MalformedCall { .. })
        ));
    }
}
