//! Module/class records, method tables and instances.
//!
//! ```text
//! ClassArena
//! ├── classes: Vec<Arc<ModuleRecord>>   (indexed by ClassId)
//! ├── generation: AtomicU64             (global, strictly increasing)
//! ├── hierarchy_epoch: AtomicU64        (bumped on include / superclass change)
//! └── definition_lock: Mutex<()>        (serializes every write)
//!
//! ModuleRecord
//! ├── superclass / includes             (ancestor inputs)
//! ├── methods: FxHashMap<Symbol, Arc<MethodEntry>>
//! ├── generation: AtomicU64             (stamp of last relevant change)
//! └── ancestors cache                   (valid for one hierarchy epoch)
//! ```

pub mod ancestors;
pub mod class;
pub mod instance;
pub mod method;
pub mod registry;
