#![forbid(unsafe_code)]

//! Field path resolution.
//!
//! A field path (`"Name.FirstName"`, `"Width"`, `"Child.Text"`) is resolved
//! once per declaring type into a [`FieldPathInfo`]: the chain of slot
//! accessors, the payload type and its converter, and the dependency
//! prefixes whose change must also notify this path.
//!
//! # Resolution rules
//!
//! - Members are looked up on the declaring type, then on each record type
//!   along the way.
//! - A boxed field (`ValueType::Container`) gets an implicit `Value`
//!   accessor, so `Width` and `Width.Value` resolve to the same slot.
//! - Reaching an owner-typed member with segments left marks the path
//!   *mapped*: the remainder is resolved against that owner at runtime.
//! - `Any`-typed members are traversed through their current value. A null
//!   value is a [`Severity::Retryable`](crate::error::Severity) failure and
//!   paths that depend on a runtime type are never cached.
//!
//! # Invariants
//!
//! 1. Successful static resolutions are cached per `(type, path)` and never
//!    change afterwards.
//! 2. Failures are never cached.
//! 3. For `A.B.C` the dependency set is exactly `{"A", "A.B"}`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::convert::{ConverterRegistry, ValueConverter};
use crate::error::{PathError, PathErrorReason};
use crate::types::{CONTAINER_VALUE, TypeDescriptor, TypeKind, TypeRegistry, ValueType};
use crate::value::{TypeName, Value};

/// One step of an accessor chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberAccess {
    pub name: Rc<str>,
    /// Slot index in the owner or record reached by the previous step.
    pub index: usize,
    /// Inserted by container unwrapping rather than written in the path.
    pub implicit: bool,
}

/// Accessor chain; most paths are one or two members deep.
pub type MemberChain = SmallVec<[MemberAccess; 4]>;

/// Where a resolved path leads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathTarget {
    /// A slot reachable from the owner through [`FieldPathInfo::members`].
    Stored,
    /// A calculated member at the given slot index of the owner.
    Calculated { index: usize },
    /// Redirected to another owner: `owner_path` yields that owner and
    /// `target_path` is resolved against it.
    Mapped { owner_path: String, target_path: String },
}

/// A resolved field path.
pub struct FieldPathInfo {
    pub declaring_type: TypeName,
    pub path: String,
    pub members: MemberChain,
    /// Payload type. `Any` for mapped paths (known only on the target).
    pub value_type: ValueType,
    pub converter: Rc<dyn ValueConverter>,
    /// Proper prefixes of the path, in order.
    pub dependencies: Vec<String>,
    pub target: PathTarget,
    /// Resolution did not depend on instance state.
    pub cacheable: bool,
}

impl FieldPathInfo {
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        matches!(self.target, PathTarget::Mapped { .. })
    }

    /// Whether a change of `path` must also notify observers of this one.
    #[must_use]
    pub fn depends_on(&self, path: &str) -> bool {
        self.dependencies.iter().any(|d| d == path)
    }
}

impl fmt::Debug for FieldPathInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPathInfo")
            .field("declaring_type", &self.declaring_type)
            .field("path", &self.path)
            .field("members", &self.members)
            .field("value_type", &self.value_type)
            .field("dependencies", &self.dependencies)
            .field("target", &self.target)
            .finish()
    }
}

/// Resolves paths and caches the results per declaring type.
///
/// `probe` is consulted only for `Any`-typed intermediates: it receives the
/// accessor chain walked so far and returns the current value there.
#[derive(Debug, Default)]
pub struct PathResolver {
    cache: RefCell<AHashMap<(TypeName, String), Rc<FieldPathInfo>>>,
}

impl PathResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached resolutions.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn resolve(
        &self,
        types: &TypeRegistry,
        converters: &ConverterRegistry,
        owner_type: &str,
        path: &str,
        probe: &dyn Fn(&[MemberAccess]) -> Value,
    ) -> Result<Rc<FieldPathInfo>, PathError> {
        let key = (TypeName::from(owner_type), path.to_owned());
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(Rc::clone(hit));
        }

        let info = Rc::new(resolve_uncached(types, converters, owner_type, path, probe)?);
        if info.cacheable {
            tracing::trace!(owner_type, path, "cached field path");
            self.cache.borrow_mut().insert(key, Rc::clone(&info));
        }
        Ok(info)
    }
}

fn resolve_uncached(
    types: &TypeRegistry,
    converters: &ConverterRegistry,
    owner_type: &str,
    path: &str,
    probe: &dyn Fn(&[MemberAccess]) -> Value,
) -> Result<FieldPathInfo, PathError> {
    let severe = |reason| PathError::severe(owner_type, path, reason);

    let declaring = types
        .get(owner_type)
        .ok_or_else(|| severe(PathErrorReason::UnknownType))?;
    if declaring.kind() != TypeKind::Owner {
        return Err(severe(PathErrorReason::UnknownType));
    }

    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(severe(PathErrorReason::EmptySegment));
    }

    let mut current: Rc<TypeDescriptor> = Rc::clone(declaring);
    let mut members = MemberChain::new();
    let mut dependencies = Vec::new();
    let mut cacheable = true;
    let mut i = 0;

    while i < segments.len() {
        let segment = segments[i];
        if i > 0 {
            dependencies.push(segments[..i].join("."));
        }
        let member = current
            .member_named(segment)
            .ok_or_else(|| severe(PathErrorReason::MemberNotFound(segment.to_owned())))?;

        if member.calculated {
            if i + 1 != segments.len() || i != 0 {
                return Err(severe(PathErrorReason::CalculatedTraversal(segment.to_owned())));
            }
            return Ok(FieldPathInfo {
                declaring_type: Rc::clone(declaring.name()),
                path: path.to_owned(),
                members,
                value_type: member.ty.clone(),
                converter: converters.converter_for(&member.ty, types),
                dependencies,
                target: PathTarget::Calculated {
                    index: member.index,
                },
                cacheable,
            });
        }

        members.push(MemberAccess {
            name: Rc::clone(&member.name),
            index: member.index,
            implicit: false,
        });
        let mut ty = member.ty.clone();

        if let ValueType::Container(inner) = ty {
            if segments.get(i + 1) == Some(&CONTAINER_VALUE) {
                i += 1;
            }
            members.push(MemberAccess {
                name: CONTAINER_VALUE.into(),
                index: 0,
                implicit: true,
            });
            ty = *inner;
        }

        let is_last = i + 1 == segments.len();
        if is_last {
            return Ok(FieldPathInfo {
                declaring_type: Rc::clone(declaring.name()),
                path: path.to_owned(),
                converter: converters.converter_for(&ty, types),
                members,
                value_type: ty,
                dependencies,
                target: PathTarget::Stored,
                cacheable,
            });
        }

        let traversed = segments[..=i].join(".");
        let next = match ty {
            ValueType::Owner(_) => None,
            ValueType::Record(name) => Some(name),
            ValueType::Any => match probe(&members) {
                Value::Null => {
                    return Err(PathError::retryable(
                        owner_type,
                        path,
                        PathErrorReason::NullIntermediate(traversed),
                    ));
                }
                Value::Record(r) => {
                    cacheable = false;
                    Some(TypeName::from(r.type_name()))
                }
                Value::Owner(_) => {
                    cacheable = false;
                    None
                }
                _ => return Err(severe(PathErrorReason::NotTraversable(traversed))),
            },
            _ => return Err(severe(PathErrorReason::NotTraversable(traversed))),
        };

        match next {
            Some(record_type) => {
                current = types
                    .get(&record_type)
                    .cloned()
                    .ok_or_else(|| severe(PathErrorReason::MemberNotFound(record_type.to_string())))?;
                i += 1;
            }
            None => {
                dependencies.push(traversed.clone());
                return Ok(FieldPathInfo {
                    declaring_type: Rc::clone(declaring.name()),
                    path: path.to_owned(),
                    members,
                    value_type: ValueType::Any,
                    converter: converters.converter_for(&ValueType::Any, types),
                    dependencies,
                    target: PathTarget::Mapped {
                        owner_path: traversed,
                        target_path: segments[i + 1..].join("."),
                    },
                    cacheable,
                });
            }
        }
    }

    Err(severe(PathErrorReason::EmptySegment))
}
