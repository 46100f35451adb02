use std::{collections::HashMap, sync::Arc};

use crate::{
    error::BusError,
    transport::Transport,
    unit::Unit,
    units::{
        compress::JpegCompress, publish::ImagePublish, resize::Resize, test_pattern::TestPattern,
        throttle::Throttle,
    },
};

/// What a unit constructor gets to see besides the requested id.
pub struct UnitContext {
    pub transport: Arc<dyn Transport>,
}

type UnitConstructor =
    Arc<dyn Fn(&UnitContext, &str) -> anyhow::Result<Box<dyn Unit>> + Send + Sync>;

/// Registry of unit constructors keyed by unit type id.
pub struct UnitManager {
    constructors: HashMap<String, UnitConstructor>,
    context: UnitContext,
}

impl UnitManager {
    /// Create a manager with the built-in units registered.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let mut manager = Self::empty(transport);
        manager.register(TestPattern::ID, |_, id| Ok(Box::new(TestPattern::new(id))));
        manager.register(Throttle::ID, |_, id| Ok(Box::new(Throttle::new(id))));
        manager.register(Resize::ID, |_, id| Ok(Box::new(Resize::new(id))));
        manager.register(JpegCompress::ID, |_, id| Ok(Box::new(JpegCompress::new(id))));
        manager.register(ImagePublish::ID, |ctx, id| {
            Ok(Box::new(ImagePublish::new(id, Arc::clone(&ctx.transport))))
        });
        manager
    }

    pub fn empty(transport: Arc<dyn Transport>) -> Self {
        Self {
            constructors: HashMap::new(),
            context: UnitContext { transport },
        }
    }

    pub fn register<F>(&mut self, type_id: &str, constructor: F)
    where
        F: Fn(&UnitContext, &str) -> anyhow::Result<Box<dyn Unit>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(type_id.to_string(), Arc::new(constructor));
    }

    /// Create a unit by id. `input.dc1394:1234` resolves to the `input.dc1394`
    /// constructor, which receives the full id.
    pub fn create_unit(&self, id: &str) -> anyhow::Result<Box<dyn Unit>> {
        let type_id = id.split(':').next().unwrap_or(id);
        let constructor = self
            .constructors
            .get(id)
            .or_else(|| self.constructors.get(type_id))
            .ok_or_else(|| BusError::UnknownUnit(id.to_string()))?;
        constructor(&self.context, id)
    }

    pub fn is_registered(&self, type_id: &str) -> bool {
        self.constructors.contains_key(type_id)
    }

    pub fn list_units(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.context.transport
    }
}
