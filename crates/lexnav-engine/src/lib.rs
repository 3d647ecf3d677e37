//! Ordered-content navigation over statutes.
//!
//! The services here are generic over a [`StatuteStore`] and a
//! [`ContentCache`]:
//!
//! - [`OrderIndexManager`] assigns, repairs and validates order indices.
//! - [`SequentialNavigator`] pages through the merged reading order.
//! - [`ContentResolver`] turns slugs and indices into positioned nodes.
//! - [`BreadcrumbBuilder`] reconstructs and invalidates ancestor trails.
//! - [`ContentEditor`] performs structural mutations and keeps the caches
//!   honest.
//!
//! [`Lexnav`] wires them to one store, one cache and one configuration.

mod context;

pub mod breadcrumb;
pub mod editor;
pub mod error;
pub mod navigator;
pub mod order;
pub mod resolver;

use std::sync::Arc;

use lexnav_core::{cache::ContentCache, config::NavigationConfig, store::StatuteStore};

pub use breadcrumb::{BreadcrumbBuilder, Crumb};
pub use editor::{ContentEditor, Placement};
pub use error::{Error, ErrorClass, Result};
pub use navigator::{Direction, Page, RangePage, SequencePage, SequentialNavigator};
pub use order::{OrderIndexManager, ReindexReport, ValidationReport};
pub use resolver::{ContentResolver, PositionMetadata, Resolution};

use context::Context;

/// Every service, sharing one store, cache and configuration.
pub struct Lexnav<S, C> {
  ctx:         Context<S, C>,
  indices:     OrderIndexManager<S, C>,
  navigator:   SequentialNavigator<S, C>,
  resolver:    ContentResolver<S, C>,
  breadcrumbs: BreadcrumbBuilder<S, C>,
  editor:      ContentEditor<S, C>,
}

impl<S: StatuteStore, C: ContentCache> Lexnav<S, C> {
  /// Validate `config` and build the services.
  pub fn new(store: S, cache: C, config: NavigationConfig) -> Result<Self> {
    config.validate()?;
    let ctx = Context {
      store:  Arc::new(store),
      cache:  Arc::new(cache),
      config: Arc::new(config),
    };

    let indices = OrderIndexManager::new(ctx.clone());
    let breadcrumbs = BreadcrumbBuilder::new(ctx.clone());
    Ok(Self {
      navigator: SequentialNavigator::new(ctx.clone(), breadcrumbs.clone()),
      resolver: ContentResolver::new(ctx.clone()),
      editor: ContentEditor::new(ctx.clone(), indices.clone(), breadcrumbs.clone()),
      indices,
      breadcrumbs,
      ctx,
    })
  }

  pub fn indices(&self) -> &OrderIndexManager<S, C> { &self.indices }

  pub fn navigator(&self) -> &SequentialNavigator<S, C> { &self.navigator }

  pub fn resolver(&self) -> &ContentResolver<S, C> { &self.resolver }

  pub fn breadcrumbs(&self) -> &BreadcrumbBuilder<S, C> { &self.breadcrumbs }

  pub fn editor(&self) -> &ContentEditor<S, C> { &self.editor }

  pub fn store(&self) -> &S { &self.ctx.store }

  pub fn cache(&self) -> &C { &self.ctx.cache }

  pub fn config(&self) -> &NavigationConfig { &self.ctx.config }
}

#[cfg(test)]
mod tests;
