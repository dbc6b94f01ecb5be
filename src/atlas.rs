use crate::config::{AppConfig, IconPreset};
use crate::data::{load_organizations, LoadedData};
use crate::debounce::Debouncer;
use crate::export::organizations_to_csv;
use crate::filter::{apply_filter, available_categories};
use crate::grouping::{group_by_coordinate, to_feature_collection, GroupIndex, LocationGroup, LocationGroups};
use crate::icon::{render_icon_from_counts, ClusterIcon, TypePalette};
use crate::render::{render_detail_panel, TableView};
use crate::types::{CoordKey, FilterState, Organization};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconSize {
    Compact,
    #[default]
    Standard,
}

impl std::str::FromStr for IconSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "compact" => Ok(IconSize::Compact),
            "standard" => Ok(IconSize::Standard),
            other => Err(anyhow::anyhow!("Unknown icon preset '{}'", other)),
        }
    }
}

/// Everything derived from one successful load. Built once, never mutated.
pub struct Atlas {
    config: AppConfig,
    records: Vec<Organization>,
    groups: LocationGroups,
    index: GroupIndex,
    categories: Vec<String>,
    palette: TypePalette,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilteredView {
    pub filter: FilterState,
    pub indices: Vec<usize>,
    pub table: TableView,
    pub table_html: String,
}

impl Atlas {
    pub fn load(config: AppConfig) -> Result<Self> {
        let data = load_organizations(&config)?;
        Ok(Self::new(config, data))
    }

    pub fn new(config: AppConfig, data: LoadedData) -> Self {
        let groups = group_by_coordinate(&data.organizations);
        let index = GroupIndex::build(&groups);
        let categories = available_categories(&data.organizations);
        let palette = TypePalette::from_config(&config.colors);

        Atlas {
            config,
            records: data.organizations,
            groups,
            index,
            categories,
            palette,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn records(&self) -> &[Organization] {
        &self.records
    }

    pub fn groups(&self) -> &LocationGroups {
        &self.groups
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn palette(&self) -> &TypePalette {
        &self.palette
    }

    pub fn view(&self, filter: FilterState) -> FilteredView {
        let filter = filter.normalized();
        let indices = apply_filter(&self.records, &filter);
        let table = TableView::build(&indices, &self.config.table);
        let table_html = table.to_html(&self.records);
        debug!(matched = indices.len(), shown = table.rows.len(), "Filtered view rebuilt");

        FilteredView { filter, indices, table, table_html }
    }

    pub fn group_at(&self, lat: f64, lon: f64) -> Option<&LocationGroup> {
        self.index.nearest(&self.groups, lat, lon, self.config.map.click_tolerance)
    }

    pub fn group_by_key(&self, key: &CoordKey) -> Option<&LocationGroup> {
        self.groups.get(key)
    }

    pub fn detail_panel(&self, group: &LocationGroup) -> String {
        render_detail_panel(group.organizations(&self.records))
    }

    /// Icon for a cluster given its per-type counts in first-seen order.
    pub fn cluster_icon(&self, counts: &[(String, usize)], size: IconSize) -> ClusterIcon {
        render_icon_from_counts(counts, self.preset(size), &self.palette)
    }

    fn preset(&self, size: IconSize) -> &IconPreset {
        match size {
            IconSize::Compact => &self.config.icons.compact,
            IconSize::Standard => &self.config.icons.standard,
        }
    }

    pub fn export_csv(&self, filter: &FilterState) -> Result<String> {
        let indices = apply_filter(&self.records, filter);
        organizations_to_csv(&self.records, &indices, b',')
    }

    /// Writes the static artifacts a page needs without the server.
    pub fn write_artifacts(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory: {:?}", dir))?;

        let features = to_feature_collection(&self.records, &self.groups, &self.palette);
        let artifacts = [
            ("groups.geojson", serde_json::to_string(&features)?),
            ("categories.json", serde_json::to_string_pretty(&self.categories)?),
            ("table.html", self.view(FilterState::default()).table_html),
            ("organizations.csv", self.export_csv(&FilterState::default())?),
        ];

        for (name, contents) in artifacts {
            let path = dir.join(name);
            fs::write(&path, contents).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Wrote {:?}", path);
        }
        Ok(())
    }

    /// Connects a debouncer to a watch channel holding the latest view.
    pub fn spawn_filter_pipeline(self: &Arc<Self>) -> FilterPipeline {
        let (debouncer, settled) = Debouncer::spawn(self.config.filter.debounce());
        let (views, latest) = watch::channel(Arc::new(self.view(FilterState::default())));
        let task = tokio::spawn(run_pipeline(Arc::clone(self), settled, views));

        FilterPipeline { debouncer, latest, task }
    }
}

async fn run_pipeline(atlas: Arc<Atlas>, mut settled: mpsc::Receiver<FilterState>, views: watch::Sender<Arc<FilteredView>>) {
    while let Some(filter) = settled.recv().await {
        let view = atlas.view(filter);
        info!(matched = view.indices.len(), "Applied filter");
        views.send_replace(Arc::new(view));
    }
}

pub struct FilterPipeline {
    debouncer: Debouncer<FilterState>,
    latest: watch::Receiver<Arc<FilteredView>>,
    task: JoinHandle<()>,
}

impl FilterPipeline {
    pub fn push(&self, filter: FilterState) {
        self.debouncer.push(filter.normalized());
    }

    pub fn current(&self) -> Arc<FilteredView> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FilteredView>> {
        self.latest.clone()
    }
}

impl Drop for FilterPipeline {
    fn drop(&mut self) {
        self.task.abort();
    }
}
