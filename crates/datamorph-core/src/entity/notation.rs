//! # Entity Notation
//!
//! The textual form of entities: `prefix:suffix(key=value,key=value)`.
//!
//! - `prefix` is optional and resolves to the caller's default when absent
//! - `content` is a comma separated list of `key=value` pairs; splitting
//!   skips separators nested inside parentheses, so a value can itself be
//!   an entity with content
//! - edges use keyword-anchored extraction (`type=`, `properties=`,
//!   `direction=`) because node identifiers such as `ns=3;i=4924` contain
//!   the same characters as the delimiters
//! - `#N/A` is the unknown value
//!
//! ## Defaults
//!
//! A field equal to its default is omitted when every defaulted field of the
//! entity matches. Edges and container indexes omit each matching default on
//! its own. Parsing fills every omitted field from the same defaults, so
//! `parse(serialize(e, d), d) == e` whenever `d` is consistent with `e`
//! (every key in `d` that applies to the entity's kind is set on `e`).

use super::{
    AssetEntity, ConceptEntity, ContainerConstraintEntity, ContainerEntity,
    ContainerIndexEntity, DataModelEntity, Direction, EdgeEntity, Entity, EntityKind,
    FromEntity, NamedIndividualEntity, NodeEntity, Notated, Prefix, ReferenceEntity,
    RelationshipEntity, ReverseConnectionEntity, UNKNOWN_TOKEN, UnitEntity, UnknownEntity,
    ViewEntity,
};
use crate::types::NotationError;
use regex_lite::Regex;
use std::collections::BTreeMap;

const ENTITY_PATTERN: &str =
    r"^(?:(?P<prefix>[^:()=,]+):)?(?P<suffix>[^()]+)(?:\((?P<content>.*)\))?$";

const EDGE_KEYWORD_PATTERN: &str = r"(?:^|,)\s*(type|properties|direction)\s*=";

/// Container index kinds accepted as an index prefix.
pub const INDEX_KINDS: [&str; 2] = ["btree", "inverted"];

/// Constraint kinds accepted as a constraint prefix.
pub const CONSTRAINT_KINDS: [&str; 2] = ["requires", "uniqueness"];

// =============================================================================
// DEFAULTS
// =============================================================================

/// Field defaults keyed by notation field name (`prefix`, `version`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    values: BTreeMap<String, String>,
}

impl Defaults {
    /// No defaults: every field is written out.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The usual model-level defaults.
    #[must_use]
    pub fn prefix_version(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self::none().with("prefix", prefix).with("version", version)
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn applicable(&self, kind: EntityKind) -> Vec<(&'static str, &str)> {
        kind.defaultable_keys()
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }
}

// =============================================================================
// SERIALIZER
// =============================================================================

/// Render an entity in notation form, omitting fields that match `defaults`.
pub fn serialize<T: Notated + ?Sized>(entity: &T, defaults: &Defaults) -> String {
    let kind = entity.kind();
    let Some(suffix) = entity.suffix() else {
        return UNKNOWN_TOKEN.to_string();
    };

    let mut dump: Vec<(&'static str, String)> = Vec::new();
    if let Prefix::Named(prefix) = entity.prefix() {
        dump.push(("prefix", prefix.clone()));
    }
    dump.extend(entity.content(defaults));

    let applicable = defaults.applicable(kind);
    let is_default = |key: &str, value: &str| {
        applicable
            .iter()
            .any(|(default_key, default_value)| *default_key == key && *default_value == value)
    };

    if kind.strips_defaults_individually() {
        dump.retain(|(key, value)| !is_default(key, value));
    } else if !applicable.is_empty()
        && applicable.iter().all(|(default_key, default_value)| {
            dump.iter()
                .any(|(key, value)| key == default_key && value == default_value)
        })
    {
        dump.retain(|(key, _)| !applicable.iter().any(|(default_key, _)| default_key == key));
    }

    let mut out = String::new();
    let mut content = Vec::new();
    for (key, value) in dump {
        if key == "prefix" {
            out.push_str(&value);
            out.push(':');
        } else {
            content.push(format!("{}={}", key, value));
        }
    }
    out.push_str(suffix);
    if !content.is_empty() {
        out.push('(');
        out.push_str(&content.join(","));
        out.push(')');
    }
    out
}

// =============================================================================
// PARSER
// =============================================================================

/// Stateless notation parser. Patterns are compiled once at construction.
#[derive(Debug, Clone)]
pub struct NotationParser {
    entity: Regex,
    edge_keyword: Regex,
}

impl NotationParser {
    /// Compile the notation grammar.
    pub fn new() -> Result<Self, NotationError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| NotationError::Malformed {
                raw: pattern.to_string(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            entity: compile(ENTITY_PATTERN)?,
            edge_keyword: compile(EDGE_KEYWORD_PATTERN)?,
        })
    }

    /// Parse `text` as an entity of `kind` (strict mode).
    pub fn parse(
        &self,
        kind: EntityKind,
        text: &str,
        defaults: &Defaults,
    ) -> Result<Entity, NotationError> {
        let raw = text.trim();
        if raw == UNKNOWN_TOKEN {
            return Ok(Entity::Unknown(UnknownEntity {
                physical: kind.is_physical(),
            }));
        }
        if kind == EntityKind::Unknown {
            return Err(NotationError::KindMismatch {
                expected: kind.name().to_string(),
                raw: raw.to_string(),
            });
        }
        if raw.is_empty() {
            return Err(malformed(raw, "empty entity"));
        }

        let captures = self
            .entity
            .captures(raw)
            .ok_or_else(|| malformed(raw, "expected prefix:suffix(content)"))?;
        let mut prefix = captures
            .name("prefix")
            .map(|m| Prefix::named(m.as_str().trim()))
            .unwrap_or_default();
        let suffix = captures
            .name("suffix")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        if suffix.is_empty() || suffix.ends_with(':') {
            return Err(malformed(raw, "empty suffix"));
        }
        let content = captures.name("content").map_or("", |m| m.as_str());

        let pairs = if kind == EntityKind::Edge {
            self.edge_pairs(raw, content)?
        } else {
            split_pairs(raw, content)?
        };
        let mut fields = Fields::new(kind, pairs, defaults)?;

        if let Some(keyword) = kind.keyword() {
            if prefix != Prefix::Undefined || suffix != keyword {
                return Err(NotationError::KindMismatch {
                    expected: kind.name().to_string(),
                    raw: raw.to_string(),
                });
            }
        }
        if prefix == Prefix::Undefined && kind.defaultable_keys().contains(&"prefix") {
            if let Some(default) = defaults.get("prefix") {
                prefix = Prefix::named(default);
            }
        }

        let entity = match kind {
            EntityKind::Concept => Entity::Concept(ConceptEntity {
                prefix,
                suffix,
                version: fields.take("version"),
            }),
            EntityKind::View => Entity::View(ViewEntity {
                prefix,
                suffix,
                version: fields.take("version"),
            }),
            EntityKind::DataModel => Entity::DataModel(DataModelEntity {
                prefix,
                suffix,
                version: fields.take("version"),
            }),
            EntityKind::Reference => Entity::Reference(ReferenceEntity {
                prefix,
                suffix,
                version: fields.take("version"),
                property: fields.take("property"),
            }),
            EntityKind::Container => Entity::Container(ContainerEntity { prefix, suffix }),
            EntityKind::Unit => Entity::Unit(UnitEntity { prefix, suffix }),
            EntityKind::Node => Entity::Node(NodeEntity { prefix, suffix }),
            EntityKind::NamedIndividual => {
                Entity::NamedIndividual(NamedIndividualEntity { prefix, suffix })
            }
            EntityKind::Edge => {
                let direction = match fields.take("direction").as_deref() {
                    None | Some("outwards") => Direction::Outwards,
                    Some("inwards") => Direction::Inwards,
                    Some(other) => return Err(invalid("direction", other)),
                };
                let edge_type = fields
                    .take("type")
                    .map(|value| self.parse_as::<NodeEntity>(&value, defaults))
                    .transpose()?;
                let properties = fields
                    .take("properties")
                    .map(|value| self.parse_as::<ViewEntity>(&value, defaults))
                    .transpose()?;
                Entity::Edge(EdgeEntity {
                    edge_type,
                    properties,
                    direction,
                })
            }
            EntityKind::ReverseConnection => {
                let property = fields.require(raw, "property")?;
                Entity::ReverseConnection(ReverseConnectionEntity { property })
            }
            EntityKind::ContainerIndex => {
                check_kind_prefix(raw, &prefix, &INDEX_KINDS)?;
                let order = fields
                    .take("order")
                    .map(|v| v.parse::<u32>().map_err(|_| invalid("order", &v)))
                    .transpose()?;
                let cursorable = fields
                    .take("cursorable")
                    .map(|v| parse_bool("cursorable", &v))
                    .transpose()?;
                let by_space = fields
                    .take("bySpace")
                    .map(|v| parse_bool("bySpace", &v))
                    .transpose()?;
                Entity::ContainerIndex(ContainerIndexEntity {
                    prefix,
                    suffix,
                    order,
                    cursorable,
                    by_space,
                })
            }
            EntityKind::ContainerConstraint => {
                check_kind_prefix(raw, &prefix, &CONSTRAINT_KINDS)?;
                let require = fields
                    .take("require")
                    .map(|value| self.parse_as::<ContainerEntity>(&value, defaults))
                    .transpose()?;
                Entity::ContainerConstraint(ContainerConstraintEntity {
                    prefix,
                    suffix,
                    require,
                })
            }
            EntityKind::Asset => Entity::Asset(AssetEntity {
                property: fields.require(raw, "property")?,
            }),
            EntityKind::Relationship => Entity::Relationship(RelationshipEntity {
                label: fields.take("label"),
            }),
            EntityKind::Unknown => {
                return Err(NotationError::KindMismatch {
                    expected: kind.name().to_string(),
                    raw: raw.to_string(),
                });
            }
        };
        fields.finish()?;
        Ok(entity)
    }

    /// Lenient mode: malformed text comes back unchanged as `Err(raw)` so the
    /// caller can finish a best-effort pass and report it later.
    pub fn parse_or_raw(
        &self,
        kind: EntityKind,
        text: &str,
        defaults: &Defaults,
    ) -> Result<Entity, String> {
        self.parse(kind, text, defaults).map_err(|_| text.to_string())
    }

    /// Parse straight into a variant type. `#N/A` is a kind mismatch here.
    pub fn parse_as<T: FromEntity>(
        &self,
        text: &str,
        defaults: &Defaults,
    ) -> Result<T, NotationError> {
        let entity = self.parse(T::KIND, text, defaults)?;
        T::from_entity(entity).ok_or_else(|| NotationError::KindMismatch {
            expected: T::KIND.name().to_string(),
            raw: text.trim().to_string(),
        })
    }

    /// Parse a comma separated list of entities (top-level commas only).
    pub fn parse_list<T: FromEntity>(
        &self,
        text: &str,
        defaults: &Defaults,
    ) -> Result<Vec<T>, NotationError> {
        split_top_level(text, ',')
            .into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| self.parse_as::<T>(item, defaults))
            .collect()
    }

    fn edge_pairs(&self, raw: &str, content: &str) -> Result<Vec<(String, String)>, NotationError> {
        let anchors: Vec<(usize, usize, String)> = self
            .edge_keyword
            .captures_iter(content)
            .filter_map(|c| {
                let whole = c.get(0)?;
                let key = c.get(1)?;
                Some((whole.start(), whole.end(), key.as_str().to_string()))
            })
            .collect();

        let leading_end = anchors.first().map_or(content.len(), |(start, _, _)| *start);
        if !content[..leading_end].trim().is_empty() {
            return Err(malformed(raw, "unexpected edge content"));
        }

        let mut pairs = Vec::with_capacity(anchors.len());
        for (i, (_, value_start, key)) in anchors.iter().enumerate() {
            let value_end = anchors.get(i + 1).map_or(content.len(), |(start, _, _)| *start);
            let value = content[*value_start..value_end]
                .trim()
                .trim_end_matches(',')
                .trim();
            pairs.push((key.clone(), value.to_string()));
        }
        Ok(pairs)
    }
}

// =============================================================================
// CONTENT FIELDS
// =============================================================================

/// Content key/value pairs of one entity, consumed field by field.
struct Fields<'d> {
    kind: EntityKind,
    values: BTreeMap<String, String>,
    defaults: &'d Defaults,
}

impl<'d> Fields<'d> {
    fn new(
        kind: EntityKind,
        pairs: Vec<(String, String)>,
        defaults: &'d Defaults,
    ) -> Result<Self, NotationError> {
        let mut values = BTreeMap::new();
        for (key, value) in pairs {
            if values.insert(key.clone(), value).is_some() {
                return Err(NotationError::DuplicateField { field: key });
            }
        }
        Ok(Self {
            kind,
            values,
            defaults,
        })
    }

    /// Take a field, falling back to the default when this kind allows one.
    fn take(&mut self, key: &str) -> Option<String> {
        self.values.remove(key).or_else(|| {
            self.kind
                .defaultable_keys()
                .contains(&key)
                .then(|| self.defaults.get(key).map(str::to_string))
                .flatten()
        })
    }

    fn require(&mut self, raw: &str, key: &str) -> Result<String, NotationError> {
        self.take(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| malformed(raw, &format!("missing '{}'", key)))
    }

    fn finish(self) -> Result<(), NotationError> {
        match self.values.into_keys().next() {
            Some(field) => Err(NotationError::UnknownField {
                kind: self.kind.name().to_string(),
                field,
            }),
            None => Ok(()),
        }
    }
}

/// Split `text` on `separator`, skipping separators inside parentheses.
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth = depth.saturating_add(1),
            ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn split_pairs(raw: &str, content: &str) -> Result<Vec<(String, String)>, NotationError> {
    let mut pairs = Vec::new();
    for item in split_top_level(content, ',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let mut key_value = split_top_level(item, '=').into_iter();
        let key = key_value.next().unwrap_or_default().trim();
        let rest: Vec<&str> = key_value.collect();
        if key.is_empty() || rest.is_empty() {
            return Err(malformed(raw, &format!("expected key=value, got '{}'", item)));
        }
        pairs.push((key.to_string(), rest.join("=").trim().to_string()));
    }
    Ok(pairs)
}

fn check_kind_prefix(raw: &str, prefix: &Prefix, allowed: &[&str]) -> Result<(), NotationError> {
    match prefix.as_str() {
        Some(kind) if !allowed.contains(&kind) => Err(malformed(
            raw,
            &format!("'{}' is not one of {}", kind, allowed.join(", ")),
        )),
        _ => Ok(()),
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, NotationError> {
    match value.trim() {
        "true" | "True" => Ok(true),
        "false" | "False" => Ok(false),
        other => Err(invalid(field, other)),
    }
}

fn malformed(raw: &str, reason: &str) -> NotationError {
    NotationError::Malformed {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

fn invalid(field: &str, value: &str) -> NotationError {
    NotationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
