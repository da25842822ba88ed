//! Class descriptors and the process-global class registry.
//!
//! A [`Klass`] is the immutable per-class metadata produced by the
//! compiler: tag, instance size, special-type flag, reference field
//! count and the method dispatch table. Descriptors are registered once
//! at startup, leaked to `'static`, and thereafter reached either by
//! tag (through the registry) or through the `dispatch` word of an
//! object header.

use opal_core::{align_up, WORD_SIZE};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

use crate::object::HEADER_SIZE;

/// A class identifier.
///
/// Tags index the class registry. Tag 0 is reserved for free-space
/// filler chunks and never names a real class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassTag(u32);

impl ClassTag {
    /// The reserved filler tag used for reclaimed heap chunks.
    pub const FREE: ClassTag = ClassTag(0);

    /// Build a tag from its raw value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ClassTag(raw)
    }

    /// Raw tag value, as stored in object headers.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Per-class method dispatch table.
///
/// Maps selector names to dispatch slots. The slot order is the layout
/// the code generator emits indirect calls against; the runtime only
/// needs the name → slot mapping.
#[derive(Debug, Default)]
pub struct MethodTable {
    names: Vec<Box<str>>,
    index: FxHashMap<Box<str>, u16>,
}

impl MethodTable {
    /// Create an empty table (classes with no methods of their own).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from selector names, in slot order.
    pub fn from_names(names: &[&str]) -> Self {
        let mut table = Self::new();
        for name in names {
            table.push(name);
        }
        table
    }

    /// Append a selector, returning its slot.
    pub fn push(&mut self, name: &str) -> u16 {
        debug_assert!(
            !self.index.contains_key(name),
            "duplicate selector {:?}",
            name
        );
        let slot = self.names.len() as u16;
        self.names.push(name.into());
        self.index.insert(name.into(), slot);
        slot
    }

    /// Dispatch slot of a selector, if present.
    #[inline]
    pub fn slot_of(&self, name: &str) -> Option<u16> {
        self.index.get(name).copied()
    }

    /// Selector name occupying `slot`.
    #[inline]
    pub fn name_of(&self, slot: u16) -> Option<&str> {
        self.names.get(slot as usize).map(|s| s.as_ref())
    }

    /// Number of dispatch slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the table has no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Immutable class descriptor.
pub struct Klass {
    tag: ClassTag,
    name: Box<str>,
    instance_size: usize,
    is_special: bool,
    field_count: u16,
    methods: MethodTable,
}

impl Klass {
    /// Descriptor for a reference-bearing class with `field_count`
    /// pointer slots.
    pub fn new(name: &str, field_count: u16, methods: MethodTable) -> Self {
        Self {
            tag: ClassTag::FREE, // assigned at registration
            name: name.into(),
            instance_size: align_up(HEADER_SIZE + field_count as usize * WORD_SIZE),
            is_special: false,
            field_count,
            methods,
        }
    }

    /// Descriptor for a special (leaf) class whose payload is
    /// `payload_bytes` of opaque data the marker must not trace.
    ///
    /// Variable-sized specials (strings, byte arrays) use this size as
    /// their minimum; larger instances go through `allocate_sized`.
    pub fn special(name: &str, payload_bytes: usize, methods: MethodTable) -> Self {
        Self {
            tag: ClassTag::FREE,
            name: name.into(),
            instance_size: align_up(HEADER_SIZE + payload_bytes),
            is_special: true,
            field_count: 0,
            methods,
        }
    }

    /// The registry tag assigned to this class.
    #[inline]
    pub fn tag(&self) -> ClassTag {
        self.tag
    }

    /// Class name, as reported by `Object.type_name`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default instance size in bytes, header included, aligned.
    #[inline]
    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    /// True if instances carry opaque payload bytes instead of
    /// reference fields; the marker skips their field region entirely.
    #[inline]
    pub fn is_special(&self) -> bool {
        self.is_special
    }

    /// Number of reference slots in an instance. Special classes
    /// report zero.
    #[inline]
    pub fn field_count(&self) -> u16 {
        self.field_count
    }

    /// Method dispatch table.
    #[inline]
    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }
}

impl std::fmt::Debug for Klass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Klass")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .field("instance_size", &self.instance_size)
            .field("is_special", &self.is_special)
            .field("field_count", &self.field_count)
            .finish()
    }
}

/// Registry of every class descriptor, indexed by tag.
pub struct KlassRegistry {
    klasses: Vec<&'static Klass>,
}

impl KlassRegistry {
    /// Create a registry holding only the reserved filler descriptor.
    pub fn new() -> Self {
        // Tag 0: the free-space filler pseudo-class. Marked special so
        // the marker never interprets reclaimed bytes as references.
        let filler: &'static Klass = Box::leak(Box::new(Klass {
            tag: ClassTag::FREE,
            name: "<free>".into(),
            instance_size: HEADER_SIZE,
            is_special: true,
            field_count: 0,
            methods: MethodTable::new(),
        }));
        Self {
            klasses: vec![filler],
        }
    }

    /// Register a descriptor, assigning it the next tag.
    ///
    /// The descriptor is leaked to `'static`: class metadata lives for
    /// the whole process, exactly like the compiler-emitted tables it
    /// stands in for.
    pub fn register(&mut self, mut klass: Klass) -> &'static Klass {
        klass.tag = ClassTag::from_raw(self.klasses.len() as u32);
        let leaked: &'static Klass = Box::leak(Box::new(klass));
        self.klasses.push(leaked);
        leaked
    }

    /// Descriptor registered under `tag`.
    #[inline]
    pub fn get(&self, tag: ClassTag) -> Option<&'static Klass> {
        self.klasses.get(tag.raw() as usize).copied()
    }

    /// Number of registered descriptors, filler included.
    #[inline]
    pub fn len(&self) -> usize {
        self.klasses.len()
    }

    /// Always false: the filler descriptor is present from creation.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for KlassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: OnceLock<RwLock<KlassRegistry>> = OnceLock::new();

/// The process-global class registry.
pub fn registry() -> &'static RwLock<KlassRegistry> {
    REGISTRY.get_or_init(|| RwLock::new(KlassRegistry::new()))
}

/// Look up a descriptor by tag in the global registry.
#[inline]
pub fn lookup(tag: ClassTag) -> Option<&'static Klass> {
    registry().read().get(tag)
}
