use gloo_storage::Storage;
use leptos::prelude::*;

use tilepaint_shared::colors::{PALETTE, hex_css, is_paint_color, user_color};

use crate::canvas::{MapCanvas, MapHandle, MapSignals};
use crate::config::{DEFAULT_PAINT_COLOR, MapConfig, TileProvider};
use crate::viewport::ViewState;

const SETTINGS_KEY: &str = "tilepaint_settings";
const ZOOM_STEP: f64 = 0.5;

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct Settings {
    tile_provider: TileProvider,
    paint_color: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tile_provider: TileProvider::Proxy,
            paint_color: DEFAULT_PAINT_COLOR.to_string(),
        }
    }
}

/// Newtype wrappers so each signal has a distinct context type.
#[derive(Clone, Copy)]
pub(crate) struct CurrentUserId(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct SelectedColor(pub RwSignal<String>);
#[derive(Clone, Copy)]
pub(crate) struct ActiveProvider(pub RwSignal<TileProvider>);

pub(crate) fn format_readout(view: &ViewState) -> String {
    format!(
        "Lat: {:.4}, Lng: {:.4}, Zoom: {:.2}",
        view.center_lat, view.center_lng, view.zoom
    )
}

pub(crate) fn format_selection_count(count: usize) -> String {
    match count {
        1 => "1 cell selected".to_string(),
        n => format!("{n} cells selected"),
    }
}

/// Root application component.
#[component]
pub fn App() -> impl IntoView {
    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let initial_color = if is_paint_color(&saved.paint_color) {
        saved.paint_color.clone()
    } else {
        DEFAULT_PAINT_COLOR.to_string()
    };

    let user_id: RwSignal<Option<String>> = RwSignal::new(None);
    let color: RwSignal<String> = RwSignal::new(initial_color);
    let provider: RwSignal<TileProvider> = RwSignal::new(saved.tile_provider);
    let signals = MapSignals {
        view: RwSignal::new(ViewState::default()),
        selection_count: RwSignal::new(0),
        hint: RwSignal::new(None),
    };

    provide_context(CurrentUserId(user_id));
    provide_context(SelectedColor(color));
    provide_context(ActiveProvider(provider));

    let config = MapConfig {
        tile_provider: provider.get_untracked(),
        ..MapConfig::default()
    };
    let handle = MapHandle::new(config, signals);

    // Persist settings to localStorage on any change
    Effect::new(move || {
        let settings = Settings {
            tile_provider: provider.get(),
            paint_color: color.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings);
    });

    Effect::new({
        let handle = handle.clone();
        move || color.with(|c| handle.set_color(c))
    });
    Effect::new({
        let handle = handle.clone();
        move || handle.set_user_id(user_id.get())
    });
    Effect::new({
        let handle = handle.clone();
        move || handle.set_provider(provider.get())
    });

    let zoom_in = {
        let handle = handle.clone();
        move |_| handle.zoom_by(ZOOM_STEP)
    };
    let zoom_out = {
        let handle = handle.clone();
        move |_| handle.zoom_by(-ZOOM_STEP)
    };
    let commit = {
        let handle = handle.clone();
        move |_| handle.commit_selection()
    };

    view! {
        <div style="width: 100%; height: 100%; position: relative;">
            <MapCanvas handle=handle />
            <div style="position: absolute; top: 12px; left: 12px; display: flex; flex-direction: column; gap: 8px; padding: 10px; background: rgba(255,255,255,0.92); border-radius: 6px; font-family: sans-serif; font-size: 0.85rem;">
                <div style="display: flex; gap: 4px;">
                    <button on:click=zoom_in title="Zoom in">"+"</button>
                    <button on:click=zoom_out title="Zoom out">"−"</button>
                </div>
                <ProviderPicker />
                <Palette />
                <UserIdInput />
                <div>
                    <span>{move || format_selection_count(signals.selection_count.get())}</span>
                    " "
                    <button
                        on:click=commit
                        disabled=move || signals.selection_count.get() == 0
                    >
                        "Commit"
                    </button>
                </div>
            </div>
            <div style="position: absolute; bottom: 12px; left: 12px; padding: 4px 8px; background: rgba(255,255,255,0.85); border-radius: 4px; font-family: monospace; font-size: 0.8rem;">
                {move || signals.view.with(format_readout)}
            </div>
            {move || {
                signals
                    .hint
                    .get()
                    .map(|hint| {
                        view! {
                            <div style="position: absolute; top: 12px; left: 50%; transform: translateX(-50%); padding: 6px 12px; background: #333; color: #fff; border-radius: 4px;">
                                {hint}
                            </div>
                        }
                    })
            }}
        </div>
    }
}

#[component]
fn ProviderPicker() -> impl IntoView {
    let ActiveProvider(provider) = expect_context();

    view! {
        <div style="display: flex; gap: 4px;">
            {TileProvider::ALL
                .into_iter()
                .map(|option| {
                    view! {
                        <button
                            style:font-weight=move || if provider.get() == option { "bold" } else { "normal" }
                            on:click=move |_| provider.set(option)
                        >
                            {option.label()}
                        </button>
                    }
                })
                .collect_view()}
        </div>
    }
}

/// Stand-in for a login surface; the id lives for this session only.
#[component]
fn UserIdInput() -> impl IntoView {
    let CurrentUserId(user_id) = expect_context();

    view! {
        <label>
            "User ID "
            <input
                type="text"
                placeholder="required to commit"
                prop:value=move || user_id.get().unwrap_or_default()
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    user_id.set((!value.trim().is_empty()).then_some(value));
                }
            />
        </label>
    }
}

#[component]
fn Palette() -> impl IntoView {
    let SelectedColor(color) = expect_context();
    let CurrentUserId(user_id) = expect_context();

    view! {
        <div style="display: flex; gap: 4px; align-items: center;">
            {PALETTE
                .iter()
                .map(|&swatch| {
                    view! {
                        <button
                            title=swatch
                            style="width: 20px; height: 20px; padding: 0; cursor: pointer;"
                            style:background=swatch
                            style:outline=move || {
                                if color.with(|c| c.eq_ignore_ascii_case(swatch)) { "2px solid #222" } else { "none" }
                            }
                            on:click=move |_| color.set(swatch.to_string())
                        ></button>
                    }
                })
                .collect_view()}
            {move || {
                user_id
                    .get()
                    .map(|id| {
                        let (r, g, b) = user_color(&id);
                        let own = hex_css(r, g, b);
                        let pick = own.clone();
                        view! {
                            <button
                                title="Your color"
                                style="width: 20px; height: 20px; padding: 0; cursor: pointer; border-radius: 50%;"
                                style:background=own
                                on:click=move |_| color.set(pick.clone())
                            ></button>
                        }
                    })
            }}
            <input
                type="color"
                prop:value=move || color.get()
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    if is_paint_color(&value) {
                        color.set(value);
                    }
                }
            />
        </div>
    }
}
