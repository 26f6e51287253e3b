//! WhisperDeck - a catalog and composer for prompt-engineering techniques
//!
//! WhisperDeck ships a fixed catalog of prompts. Users filter, search and
//! sort it, keep favorites, select up to five prompts or build an ordered
//! chain, and copy the composed result under a daily quota. Architect mode,
//! granted by account email or by a passphrase that lasts until midnight,
//! lifts the quota.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use whisperdeck::{
//!     system_clock, Catalog, LocalTemplateStore, Session, SharedStore, Storage,
//!     TemplatesGateway,
//! };
//!
//! let storage = Storage::new()?;
//! storage.init()?;
//! let store: SharedStore = Arc::new(storage);
//! let clock = system_clock();
//!
//! let templates = TemplatesGateway::new(Box::new(LocalTemplateStore::new(
//!     store.clone(),
//!     clock.clone(),
//! )));
//! let mut session = Session::new(Catalog::builtin()?, store, clock, templates, None);
//! session.start();
//!
//! let text = session.copy_prompts(&[1, 8])?;
//! println!("{}", text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! - [`session`]: the container that owns every store
//! - [`ledger`]: daily copy quota, usage counters and levels
//! - [`architect`]: architect mode gate
//! - [`favorites`], [`selection`], [`chain`]: what the user has picked
//! - [`pipeline`]: filter, fuzzy search and sort of the visible list
//! - [`templates`]: saved chains behind a pluggable store
//! - [`storage`]: key/value persistence, file-backed or in memory
//! - `remote`: hosted template store (feature `remote`)

pub mod architect;
pub mod catalog;
pub mod chain;
pub mod clipboard;
pub mod clock;
pub mod compose;
pub mod config;
pub mod error;
pub mod favorites;
pub mod identity;
pub mod layout;
pub mod ledger;
pub mod logging;
pub mod matching;
pub mod pipeline;
pub mod selection;
pub mod session;
pub mod storage;
pub mod templates;

#[cfg(feature = "remote")]
pub mod remote;

pub use architect::{PrivilegedModeGate, ARCHITECT_EMAIL};
pub use catalog::{Catalog, Prompt, PromptId};
pub use chain::{ChainAdd, ChainComposer, ChainNode};
pub use clipboard::{Clipboard, CopyTarget};
pub use clock::{system_clock, Clock, SharedClock, SystemClock};
pub use compose::{compose_meta_prompt, parse_id_list};
pub use config::Config;
pub use error::{DeckError, TemplateError};
pub use favorites::FavoritesStore;
pub use identity::Identity;
pub use layout::{LayoutPrefs, Panel};
pub use ledger::{LedgerState, UsageLedger, DAILY_COPY_LIMIT};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use matching::{FuzzySearcher, MatchResult, Matcher};
pub use pipeline::{FilterState, SearchFilterPipeline, SortOrder};
pub use selection::{SelectionChange, SelectionStore, MAX_SELECTION};
pub use session::{Session, SessionStatus, POLL_INTERVAL};
pub use storage::{KeyValueStore, MemoryStore, SharedStore, Storage};
pub use templates::{
    ChainTemplate, LocalTemplateStore, NewTemplate, TemplatePatch, TemplateStore,
    TemplatesGateway,
};

#[cfg(feature = "remote")]
pub use remote::RemoteTemplateStore;
