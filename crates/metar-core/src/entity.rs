use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;

/// State value reported by an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for SensorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorValue::Number(n) => write!(f, "{}", n),
            SensorValue::Text(s) => f.write_str(s),
        }
    }
}

/// A polled value exposed by a platform
///
/// `update` must not fail: implementations log their own errors and keep
/// whatever state they had.
#[async_trait]
pub trait Entity: Send + Sync {
    /// Display name
    fn name(&self) -> String;

    /// Stable identifier, unique across all platforms
    fn unique_id(&self) -> String;

    /// Current state, `None` while unknown
    fn state(&self) -> Option<SensorValue>;

    fn unit_of_measurement(&self) -> Option<&str>;

    /// Refresh the state
    async fn update(&mut self);
}

/// Serializable view of one entity's state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub name: String,
    pub state: Option<SensorValue>,
    pub unit: Option<String>,
}

impl EntityState {
    pub fn of(entity: &dyn Entity) -> Self {
        Self {
            unique_id: entity.unique_id(),
            name: entity.name(),
            state: entity.state(),
            unit: entity.unit_of_measurement().map(str::to_string),
        }
    }
}

pub(crate) struct RegisteredEntity {
    pub(crate) entity: Box<dyn Entity>,
    pub(crate) update_before_add: bool,
}

/// Entities handed over by platforms during setup
#[derive(Default)]
pub struct EntityRegistry {
    entries: Vec<RegisteredEntity>,
    ids: HashSet<String>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add entities; entities whose unique id is already registered are dropped.
    ///
    /// With `update_before_add`, the host updates the entities once before
    /// their state is first read. Returns how many were added.
    pub fn add_entities(&mut self, entities: Vec<Box<dyn Entity>>, update_before_add: bool) -> usize {
        let mut added = 0;
        for entity in entities {
            let id = entity.unique_id();
            if !self.ids.insert(id.clone()) {
                tracing::warn!("Entity {} already registered, skipping", id);
                continue;
            }
            tracing::debug!("Registered entity {} ({})", entity.name(), id);
            self.entries.push(RegisteredEntity {
                entity,
                update_before_add,
            });
            added += 1;
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &dyn Entity> {
        self.entries.iter().map(|e| e.entity.as_ref() as &dyn Entity)
    }

    pub fn states(&self) -> Vec<EntityState> {
        self.entities().map(EntityState::of).collect()
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut RegisteredEntity> {
        self.entries.iter_mut()
    }
}
