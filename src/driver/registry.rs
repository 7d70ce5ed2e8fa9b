//! Per-session resource registry.
//!
//! Clients refer to server-side objects by small integer handles. Every
//! object lives in one map keyed by `(ResourceType, Handle)`; each type has
//! its own monotonic handle allocator, so handles never collide across
//! types and a released handle is never handed out again.

use crate::core::engine::{Document, Enquire, MSet, MultiValueKeyMaker, ValueCountMatchSpy, Weighting};
use crate::driver::cursor::Cursor;
use crate::driver::error::{DriverError, DriverResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Client-visible object handle; 0 means "none"
pub type Handle = u32;

/// Kinds of registry objects, with their wire tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    Document,
    Enquire,
    ResultSet,
    Cursor,
    Weight,
    KeyMaker,
    Query,
    MatchDecider,
    Stemmer,
    ExpandDecider,
    RangeProcessor,
    MatchSpy,
}

impl ResourceType {
    pub const ALL: [ResourceType; 12] = [
        ResourceType::Document,
        ResourceType::Enquire,
        ResourceType::ResultSet,
        ResourceType::Cursor,
        ResourceType::Weight,
        ResourceType::KeyMaker,
        ResourceType::Query,
        ResourceType::MatchDecider,
        ResourceType::Stemmer,
        ResourceType::ExpandDecider,
        ResourceType::RangeProcessor,
        ResourceType::MatchSpy,
    ];

    pub fn tag(self) -> u8 {
        match self {
            ResourceType::Document => 0,
            ResourceType::Enquire => 1,
            ResourceType::ResultSet => 2,
            ResourceType::Cursor => 3,
            ResourceType::Weight => 4,
            ResourceType::KeyMaker => 5,
            ResourceType::Query => 6,
            ResourceType::MatchDecider => 7,
            ResourceType::Stemmer => 8,
            ResourceType::ExpandDecider => 9,
            ResourceType::RangeProcessor => 10,
            ResourceType::MatchSpy => 11,
        }
    }

    pub fn from_tag(tag: u8) -> DriverResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == tag)
            .ok_or(DriverError::BadCommand(tag))
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceType::Document => "Document",
            ResourceType::Enquire => "Enquire",
            ResourceType::ResultSet => "ResultSet",
            ResourceType::Cursor => "Cursor",
            ResourceType::Weight => "Weight",
            ResourceType::KeyMaker => "KeyMaker",
            ResourceType::Query => "Query",
            ResourceType::MatchDecider => "MatchDecider",
            ResourceType::Stemmer => "Stemmer",
            ResourceType::ExpandDecider => "ExpandDecider",
            ResourceType::RangeProcessor => "RangeProcessor",
            ResourceType::MatchSpy => "MatchSpy",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored object
#[derive(Debug)]
pub enum Resource {
    Document(Document),
    Enquire(Enquire),
    ResultSet(Arc<MSet>),
    Cursor(Cursor),
    Weight(Weighting),
    KeyMaker(MultiValueKeyMaker),
    MatchSpy(ValueCountMatchSpy),
}

impl Resource {
    pub fn kind(&self) -> ResourceType {
        match self {
            Resource::Document(_) => ResourceType::Document,
            Resource::Enquire(_) => ResourceType::Enquire,
            Resource::ResultSet(_) => ResourceType::ResultSet,
            Resource::Cursor(_) => ResourceType::Cursor,
            Resource::Weight(_) => ResourceType::Weight,
            Resource::KeyMaker(_) => ResourceType::KeyMaker,
            Resource::MatchSpy(_) => ResourceType::MatchSpy,
        }
    }

    /// Label reported by GET_RESOURCE_INFO
    pub fn describe(&self) -> String {
        match self {
            Resource::Weight(w) => w.name().to_string(),
            Resource::MatchSpy(s) => format!("ValueCountMatchSpy(slot={})", s.slot()),
            Resource::KeyMaker(k) => format!("MultiValueKeyMaker(slots={})", k.slots().len()),
            other => other.kind().name().to_string(),
        }
    }
}

/// Typed access to one variant of [`Resource`]
pub trait RegistryObject: Sized {
    const TYPE: ResourceType;

    fn into_resource(self) -> Resource;
    fn from_resource(resource: &Resource) -> Option<&Self>;
    fn from_resource_mut(resource: &mut Resource) -> Option<&mut Self>;
    fn from_owned(resource: Resource) -> Option<Self>;
}

macro_rules! registry_object {
    ($ty:ty, $variant:ident) => {
        impl RegistryObject for $ty {
            const TYPE: ResourceType = ResourceType::$variant;

            fn into_resource(self) -> Resource {
                Resource::$variant(self)
            }

            fn from_resource(resource: &Resource) -> Option<&Self> {
                match resource {
                    Resource::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_resource_mut(resource: &mut Resource) -> Option<&mut Self> {
                match resource {
                    Resource::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_owned(resource: Resource) -> Option<Self> {
                match resource {
                    Resource::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

registry_object!(Document, Document);
registry_object!(Enquire, Enquire);
registry_object!(Arc<MSet>, ResultSet);
registry_object!(Cursor, Cursor);
registry_object!(Weighting, Weight);
registry_object!(MultiValueKeyMaker, KeyMaker);
registry_object!(ValueCountMatchSpy, MatchSpy);

/// One entry of [`Registry::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub kind: ResourceType,
    pub handle: Handle,
    pub name: String,
}

/// Owner of every live object in a session
#[derive(Debug, Default)]
pub struct Registry {
    objects: BTreeMap<(ResourceType, Handle), Resource>,
    last_issued: BTreeMap<ResourceType, Handle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(kind: ResourceType, handle: Handle) -> DriverError {
        DriverError::ResourceNotFound { kind, handle }
    }

    /// Store `object` under a fresh handle
    pub fn create<T: RegistryObject>(&mut self, object: T) -> DriverResult<Handle> {
        self.insert(object.into_resource())
    }

    /// Store an already wrapped object under a fresh handle
    pub fn insert(&mut self, resource: Resource) -> DriverResult<Handle> {
        let kind = resource.kind();
        let last = self.last_issued.get(&kind).copied().unwrap_or(0);
        let handle = last.checked_add(1).ok_or_else(|| {
            DriverError::BadArgument(format!("{kind} handle space exhausted"))
        })?;
        self.last_issued.insert(kind, handle);
        self.objects.insert((kind, handle), resource);
        Ok(handle)
    }

    pub fn get<T: RegistryObject>(&self, handle: Handle) -> DriverResult<&T> {
        self.objects
            .get(&(T::TYPE, handle))
            .and_then(T::from_resource)
            .ok_or_else(|| Self::not_found(T::TYPE, handle))
    }

    pub fn get_mut<T: RegistryObject>(&mut self, handle: Handle) -> DriverResult<&mut T> {
        self.objects
            .get_mut(&(T::TYPE, handle))
            .and_then(T::from_resource_mut)
            .ok_or_else(|| Self::not_found(T::TYPE, handle))
    }

    pub fn contains(&self, kind: ResourceType, handle: Handle) -> bool {
        self.objects.contains_key(&(kind, handle))
    }

    /// Destroy an object; its handle is never reissued
    pub fn release(&mut self, kind: ResourceType, handle: Handle) -> DriverResult<()> {
        self.objects
            .remove(&(kind, handle))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(kind, handle))
    }

    /// Move an object out while keeping its handle reserved; pair with
    /// [`put_back`](Self::put_back)
    pub fn take<T: RegistryObject>(&mut self, handle: Handle) -> DriverResult<T> {
        self.objects
            .remove(&(T::TYPE, handle))
            .and_then(T::from_owned)
            .ok_or_else(|| Self::not_found(T::TYPE, handle))
    }

    pub fn put_back<T: RegistryObject>(&mut self, handle: Handle, object: T) {
        self.objects.insert((T::TYPE, handle), object.into_resource());
    }

    /// Live objects sorted by type, then handle
    pub fn list(&self) -> Vec<ResourceInfo> {
        self.objects
            .iter()
            .map(|(&(kind, handle), resource)| ResourceInfo {
                kind,
                handle,
                name: resource.describe(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every object; allocators keep counting
    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
