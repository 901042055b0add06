//! `show` command: print stored aggregates as JSON.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pcidb_core::{AggregateStore, Root, Section};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sync::open_store;
use crate::{ARG_DATABASE, CliError, ENV_SHOW_DATABASE};

/// Shared arguments for every `show` target.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[ortho_config(prefix = "PCIDB")]
pub(crate) struct ShowArgs {
    /// Path to the SQLite aggregate database.
    #[arg(long = ARG_DATABASE, value_name = "path", global = true)]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl ShowArgs {
    fn into_database(self) -> Result<Utf8PathBuf, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        merged.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_SHOW_DATABASE,
        })
    }
}

/// What to print.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub(crate) enum ShowTarget {
    /// The repository marker: ingested version and last update.
    Repository,
    /// Every vendor with its devices and subdevices.
    Vendors,
    /// One vendor by id.
    Vendor {
        /// Four-digit hexadecimal vendor id.
        id: String,
    },
    /// Devices flattened with their vendor, optionally filtered.
    Devices {
        /// Only devices of this vendor.
        #[arg(long)]
        vendor: Option<String>,
        /// Only devices with this id.
        #[arg(long)]
        device: Option<String>,
    },
    /// One device of one vendor.
    Device {
        /// Vendor id.
        vendor: String,
        /// Device id.
        device: String,
    },
    /// Every device class with its subclasses and programming interfaces.
    Classes,
    /// One class by id.
    Class {
        /// Two-digit hexadecimal class id.
        id: String,
    },
}

/// A device together with its vendor, as listed by `show devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct DeviceView {
    pub(crate) vendor_id: String,
    pub(crate) vendor_name: String,
    pub(crate) device_id: String,
    pub(crate) device_name: String,
    pub(crate) subdevices: Vec<SubdeviceView>,
}

/// One subsystem entry of a [`DeviceView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SubdeviceView {
    pub(crate) subvendor_id: Option<String>,
    pub(crate) subdevice_id: String,
    pub(crate) subdevice_name: String,
}

impl DeviceView {
    fn of(vendor: &Root) -> impl Iterator<Item = Self> + '_ {
        vendor.children.iter().map(|device| Self {
            vendor_id: vendor.id.clone(),
            vendor_name: vendor.name.clone(),
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            subdevices: device
                .descendants
                .iter()
                .map(|subdevice| SubdeviceView {
                    subvendor_id: subdevice.aux.clone(),
                    subdevice_id: subdevice.id.clone(),
                    subdevice_name: subdevice.name.clone(),
                })
                .collect(),
        })
    }
}

pub(super) fn run_show(
    args: ShowArgs,
    target: &ShowTarget,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let database = args.into_database()?;
    let exists = pcidb_fs::is_regular_file(&database).map_err(|source| {
        CliError::PrepareDatabase {
            path: database.clone(),
            source,
        }
    })?;
    if !exists {
        return Err(CliError::MissingDatabase { path: database });
    }
    let store = open_store(&database)?;
    let value = render(&store, target)?;
    write_json(writer, &value)
}

/// Look up `target` in `store` and convert it to JSON.
pub(crate) fn render<S>(store: &S, target: &ShowTarget) -> Result<Value, CliError>
where
    S: AggregateStore + ?Sized,
{
    match target {
        ShowTarget::Repository => to_json(&store.load_marker()?.unwrap_or_default()),
        ShowTarget::Vendors => to_json(&store.list_roots(Section::Devices)?),
        ShowTarget::Vendor { id } => to_json(&require_root(store, Section::Devices, id)?),
        ShowTarget::Devices { vendor, device } => {
            let vendors: Vec<Root> = match vendor {
                Some(id) => store.find_root(Section::Devices, id)?.into_iter().collect(),
                None => store.list_roots(Section::Devices)?,
            };
            let devices: Vec<DeviceView> = vendors
                .iter()
                .flat_map(DeviceView::of)
                .filter(|view| device.as_ref().is_none_or(|id| view.device_id == *id))
                .collect();
            to_json(&devices)
        }
        ShowTarget::Device { vendor, device } => {
            let root = require_root(store, Section::Devices, vendor)?;
            let view = DeviceView::of(&root)
                .find(|view| view.device_id == *device)
                .ok_or_else(|| CliError::NotFound {
                    what: "device",
                    id: format!("{vendor}:{device}"),
                })?;
            to_json(&view)
        }
        ShowTarget::Classes => to_json(&store.list_roots(Section::Classes)?),
        ShowTarget::Class { id } => to_json(&require_root(store, Section::Classes, id)?),
    }
}

fn require_root<S>(store: &S, section: Section, id: &str) -> Result<Root, CliError>
where
    S: AggregateStore + ?Sized,
{
    store
        .find_root(section, id)?
        .ok_or_else(|| CliError::NotFound {
            what: match section {
                Section::Devices => "vendor",
                Section::Classes => "class",
            },
            id: id.to_owned(),
        })
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(CliError::Serialise)
}

fn write_json(writer: &mut dyn Write, value: &Value) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::Serialise)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn show_database_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<Utf8PathBuf, CliError> {
    let merged = ShowArgs::merge_from_layers(layers).map_err(CliError::from)?;
    merged.database.ok_or(CliError::MissingArgument {
        field: ARG_DATABASE,
        env: ENV_SHOW_DATABASE,
    })
}
