//! Device command handlers.

use serde::Serialize;
use tabled::Tabled;

use ilex_core::{
    DeviceInfo, Entity, EntityContext, EntityState, Platform, SensorDeviceClass, entities_for,
};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

// ── Devices ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DeviceSummary {
    serial: String,
    #[serde(flatten)]
    info: DeviceInfo,
    connected: EntityState,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Connected")]
    connected: String,
}

fn device_summaries(ctx: &EntityContext) -> Vec<DeviceSummary> {
    let entities = entities_for(ctx.known_devices());
    ctx.known_devices()
        .iter()
        .map(|(serial, entry)| {
            let connected = entities
                .iter()
                .find(|e| e.serial() == serial && e.translation_key() == "connected")
                .map_or(EntityState::Unknown, |e| e.state(ctx));
            DeviceSummary {
                serial: serial.to_string(),
                info: DeviceInfo::from_entry(entry),
                connected,
            }
        })
        .collect()
}

// ── Entities ────────────────────────────────────────────────────────

/// One entity with its state, as printed by `devices show` and `watch`.
#[derive(Serialize)]
pub struct EntityView {
    pub unique_id: String,
    pub serial: String,
    pub platform: Platform,
    pub translation_key: &'static str,
    pub state: EntityState,
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<SensorDeviceClass>,
}

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity")]
    unique_id: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

impl EntityView {
    fn new(entity: &Entity, ctx: &EntityContext) -> Self {
        Self {
            unique_id: entity.unique_id(),
            serial: entity.serial().to_string(),
            platform: entity.platform(),
            translation_key: entity.translation_key(),
            state: entity.state(ctx),
            unit: entity.unit().map(|u| u.to_string()),
            device_class: entity.device_class(),
        }
    }
}

/// Entity views for every device, or only for `serial`.
pub fn entity_views(ctx: &EntityContext, serial: Option<&str>) -> Vec<EntityView> {
    entities_for(ctx.known_devices())
        .iter()
        .filter(|e| serial.is_none_or(|s| e.serial() == s))
        .map(|e| EntityView::new(e, ctx))
        .collect()
}

pub fn render_entities(views: &[EntityView], global: &GlobalOpts) -> Result<String, CliError> {
    let color = output::should_color(&global.color);
    output::render_list(
        &global.output,
        views,
        |v| EntityRow {
            unique_id: v.unique_id.clone(),
            platform: v.platform.to_string(),
            name: v.translation_key.to_string(),
            state: output::paint_state(&v.state, color),
            unit: v.unit.clone().unwrap_or_default(),
        },
        |v| format!("{}={}", v.unique_id, v.state),
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: DevicesArgs,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let coordinator = super::connect(resolved).await?;
    let ctx = coordinator.entity_context();

    let out = match args.command {
        DevicesCommand::List => {
            let color = output::should_color(&global.color);
            let summaries = device_summaries(&ctx);
            output::render_list(
                &global.output,
                &summaries,
                |d| DeviceRow {
                    serial: d.serial.clone(),
                    name: d.info.name.clone(),
                    model: d.info.model.clone(),
                    firmware: d.info.sw_version.clone().unwrap_or_else(|| "-".into()),
                    connected: output::paint_state(&d.connected, color),
                },
                |d| d.serial.clone(),
            )?
        }
        DevicesCommand::Show { serial } => {
            if !ctx.known_devices().contains(&serial) {
                return Err(CliError::NotFound {
                    resource_type: "device".into(),
                    identifier: serial,
                    list_command: "devices list".into(),
                });
            }
            render_entities(&entity_views(&ctx, Some(&serial)), global)?
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
