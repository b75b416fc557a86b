//! Owner arena
//!
//! One [`TriggerRouter`] per owner, all instantiated from a shared immutable
//! catalog. Runtime state is keyed by (owner, skill id) and never shared.

use std::collections::HashMap;
use std::sync::Arc;

use skillcast_core::{FrameClock, OwnerId};
use skillcast_remote::RemoteSkillAgent;
use tracing::{debug, info};

use crate::config::{OwnerConfig, SkillCatalog};
use crate::error::SkillError;
use crate::logic::SkillLogic;
use crate::router::{Dispatch, FrameReport, TriggerRouter};

type LogicFactory = Box<dyn Fn() -> Box<dyn SkillLogic> + Send + Sync>;

/// Constructors for skill logic, keyed by skill id
#[derive(Default)]
pub struct LogicLibrary {
    factories: HashMap<String, LogicFactory>,
    fallback: Option<LogicFactory>,
}

impl LogicLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the logic constructor of one skill.
    pub fn insert<F, L>(&mut self, skill_id: impl Into<String>, factory: F)
    where
        F: Fn() -> L + Send + Sync + 'static,
        L: SkillLogic + 'static,
    {
        self.factories.insert(
            skill_id.into(),
            Box::new(move || -> Box<dyn SkillLogic> { Box::new(factory()) }),
        );
    }

    pub fn with<F, L>(mut self, skill_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> L + Send + Sync + 'static,
        L: SkillLogic + 'static,
    {
        self.insert(skill_id, factory);
        self
    }

    /// Logic used for skills without their own constructor.
    pub fn with_fallback<F, L>(mut self, factory: F) -> Self
    where
        F: Fn() -> L + Send + Sync + 'static,
        L: SkillLogic + 'static,
    {
        self.fallback = Some(Box::new(move || -> Box<dyn SkillLogic> { Box::new(factory()) }));
        self
    }

    /// Build a fresh logic instance for one owner.
    pub fn create(&self, skill_id: &str) -> Result<Box<dyn SkillLogic>, SkillError> {
        self.factories
            .get(skill_id)
            .or(self.fallback.as_ref())
            .map(|factory| factory())
            .ok_or_else(|| SkillError::MissingLogic(skill_id.to_string()))
    }

    pub fn contains(&self, skill_id: &str) -> bool {
        self.factories.contains_key(skill_id)
    }
}

pub struct SkillWorld {
    catalog: SkillCatalog,
    library: LogicLibrary,
    owners: HashMap<OwnerId, TriggerRouter>,
    remote: Option<Arc<dyn RemoteSkillAgent>>,
    now: f64,
}

impl SkillWorld {
    pub fn new(catalog: SkillCatalog, library: LogicLibrary) -> Self {
        Self {
            catalog,
            library,
            owners: HashMap::new(),
            remote: None,
            now: 0.0,
        }
    }

    /// Bind a remote agent to every owner spawned from now on.
    pub fn with_remote_agent(mut self, agent: Arc<dyn RemoteSkillAgent>) -> Self {
        self.remote = Some(agent);
        self
    }

    /// Spawn an owner with a fresh id and its preload skills.
    pub fn spawn_owner(&mut self, config: &OwnerConfig) -> Result<OwnerId, SkillError> {
        let id = OwnerId::new();
        self.spawn_owner_with_id(id, config)?;
        Ok(id)
    }

    /// Spawn an owner under a known id. Nothing is spawned if a preload
    /// skill is missing from the catalog or the library.
    pub fn spawn_owner_with_id(&mut self, id: OwnerId, config: &OwnerConfig) -> Result<(), SkillError> {
        if self.owners.contains_key(&id) {
            return Err(SkillError::DuplicateOwner(id));
        }

        let mut router = TriggerRouter::starting_at(config, self.now);
        router.set_remote_agent(self.remote.clone());
        for skill_id in &config.preload {
            let definition = self
                .catalog
                .get(skill_id)
                .cloned()
                .ok_or_else(|| SkillError::UnknownSkill(skill_id.clone()))?;
            router.register(definition, self.library.create(skill_id)?)?;
        }

        info!("Spawned owner {} with {} skills", id, router.len());
        self.owners.insert(id, router);
        Ok(())
    }

    /// Remove an owner. Running effects are discarded without callbacks.
    pub fn despawn_owner(&mut self, id: OwnerId) -> bool {
        match self.owners.remove(&id) {
            Some(mut router) => {
                router.clear();
                debug!("Despawned owner {}", id);
                true
            }
            None => false,
        }
    }

    /// Give an owner a skill from the catalog.
    pub fn add_skill(&mut self, owner: OwnerId, skill_id: &str) -> Result<(), SkillError> {
        let definition = self
            .catalog
            .get(skill_id)
            .cloned()
            .ok_or_else(|| SkillError::UnknownSkill(skill_id.to_string()))?;
        let logic = self.library.create(skill_id)?;
        self.router_mut(owner)?.register(definition, logic)
    }

    pub fn remove_skill(&mut self, owner: OwnerId, skill_id: &str) -> Result<bool, SkillError> {
        Ok(self.router_mut(owner)?.unregister(skill_id))
    }

    /// Fire a named event on one owner.
    pub fn invoke(&mut self, owner: OwnerId, event: &str) -> Result<Vec<Dispatch>, SkillError> {
        Ok(self.router_mut(owner)?.invoke(event))
    }

    /// Advance every owner to the clock's frame.
    pub fn update(&mut self, clock: &FrameClock) -> Vec<(OwnerId, FrameReport)> {
        self.now = clock.now();
        self.owners
            .iter_mut()
            .map(|(id, router)| (*id, router.update(clock)))
            .collect()
    }

    pub fn router(&self, owner: OwnerId) -> Option<&TriggerRouter> {
        self.owners.get(&owner)
    }

    pub fn router_mut(&mut self, owner: OwnerId) -> Result<&mut TriggerRouter, SkillError> {
        self.owners.get_mut(&owner).ok_or(SkillError::UnknownOwner(owner))
    }

    pub fn owners(&self) -> impl Iterator<Item = OwnerId> + '_ {
        self.owners.keys().copied()
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{DurationPolicy, SkillDefinition};
    use crate::logic::{Activation, NoopLogic, SkillContext};
    use crate::scheduler::ActiveEffect;
    use parking_lot::Mutex;

    struct CountRemoves(Arc<Mutex<usize>>);

    impl SkillLogic for CountRemoves {
        fn on_add(&mut self, _ctx: &SkillContext<'_>, _existing: Option<&ActiveEffect>) -> Activation {
            Activation::success()
        }

        fn on_remove(&mut self, _ctx: &SkillContext<'_>) {
            *self.0.lock() += 1;
        }
    }

    fn catalog() -> SkillCatalog {
        SkillCatalog::new(vec![
            SkillDefinition::instant("dash", "skill_1")
                .with_charges(2)
                .with_cooldown(3.0),
            SkillDefinition::instant("aura", "skill_2").with_duration(10.0, DurationPolicy::Overlay),
        ])
        .unwrap()
    }

    fn preload(ids: &[&str]) -> OwnerConfig {
        OwnerConfig {
            preload: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_owners_do_not_share_state() {
        let mut world = SkillWorld::new(catalog(), LogicLibrary::new().with_fallback(|| NoopLogic));
        let a = world.spawn_owner(&preload(&["dash"])).unwrap();
        let b = world.spawn_owner(&preload(&["dash"])).unwrap();

        world.invoke(a, "skill_1").unwrap();
        world.invoke(a, "skill_1").unwrap();

        assert_eq!(world.router(a).unwrap().state("dash").unwrap().charges, 0);
        assert_eq!(world.router(b).unwrap().state("dash").unwrap().charges, 2);
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_unknown_preload_spawns_nothing() {
        let mut world = SkillWorld::new(catalog(), LogicLibrary::new().with_fallback(|| NoopLogic));
        let result = world.spawn_owner(&preload(&["dash", "meteor"]));
        assert!(matches!(result, Err(SkillError::UnknownSkill(id)) if id == "meteor"));
        assert!(world.is_empty());
    }

    #[test]
    fn test_missing_logic() {
        let mut world = SkillWorld::new(catalog(), LogicLibrary::new().with("dash", || NoopLogic));
        let owner = world.spawn_owner(&preload(&["dash"])).unwrap();
        assert!(matches!(
            world.add_skill(owner, "aura"),
            Err(SkillError::MissingLogic(_))
        ));
        assert!(world.router(owner).unwrap().contains("dash"));
    }

    #[test]
    fn test_duplicate_owner_id() {
        let mut world = SkillWorld::new(catalog(), LogicLibrary::new().with_fallback(|| NoopLogic));
        let id = OwnerId::new();
        world.spawn_owner_with_id(id, &OwnerConfig::default()).unwrap();
        assert!(matches!(
            world.spawn_owner_with_id(id, &OwnerConfig::default()),
            Err(SkillError::DuplicateOwner(_))
        ));
    }

    #[test]
    fn test_add_and_remove_skills() {
        let removes = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&removes);
        let library = LogicLibrary::new()
            .with("dash", || NoopLogic)
            .with("aura", move || CountRemoves(Arc::clone(&counter)));
        let mut world = SkillWorld::new(catalog(), library);
        let owner = world.spawn_owner(&OwnerConfig::default()).unwrap();

        world.add_skill(owner, "aura").unwrap();
        assert!(matches!(
            world.add_skill(owner, "aura"),
            Err(SkillError::DuplicateSkill(_))
        ));
        world.invoke(owner, "skill_2").unwrap();

        assert!(world.remove_skill(owner, "aura").unwrap());
        assert!(!world.remove_skill(owner, "aura").unwrap());
        assert_eq!(*removes.lock(), 1);
    }

    #[test]
    fn test_despawn_skips_callbacks() {
        let removes = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&removes);
        let library = LogicLibrary::new().with_fallback(move || CountRemoves(Arc::clone(&counter)));
        let mut world = SkillWorld::new(catalog(), library);
        let owner = world.spawn_owner(&preload(&["aura"])).unwrap();
        world.invoke(owner, "skill_2").unwrap();

        assert!(world.despawn_owner(owner));
        assert!(!world.despawn_owner(owner));
        assert_eq!(*removes.lock(), 0);
        assert!(matches!(
            world.invoke(owner, "skill_2"),
            Err(SkillError::UnknownOwner(_))
        ));
    }

    #[test]
    fn test_update_drives_every_owner() {
        let mut world = SkillWorld::new(catalog(), LogicLibrary::new().with_fallback(|| NoopLogic));
        let a = world.spawn_owner(&preload(&["dash"])).unwrap();
        let b = world.spawn_owner(&preload(&["dash"])).unwrap();
        world.invoke(a, "skill_1").unwrap();
        world.invoke(b, "skill_1").unwrap();

        let mut clock = FrameClock::default();
        for _ in 0..16 {
            clock.advance(0.2);
            world.update(&clock);
        }

        for owner in [a, b] {
            assert_eq!(world.router(owner).unwrap().state("dash").unwrap().charges, 2);
        }

        // Owners spawned later start on the current clock
        let c = world.spawn_owner(&preload(&["dash"])).unwrap();
        assert!((world.router(c).unwrap().now() - clock.now()).abs() < 1e-9);
    }
}
