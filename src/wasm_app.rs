use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures_util::future::LocalBoxFuture;
use gloo_timers::callback::Interval;
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    Document, Element, HtmlInputElement, HtmlSelectElement, HtmlTableRowElement,
    HtmlTableSectionElement, Request, RequestInit,
};

use crate::dashboard::Dashboard;
use crate::error::{ScanError, ScanResult};
use crate::models::{LogEntry, PinDescriptor, PinValueRequest, PinValueResponse};
use crate::options::{parse_refresh_ms, ClientConfig, OverlapPolicy};
use crate::panels::{PanelHost, PanelId, PanelManager};
use crate::poller::Scheduler;
use crate::service::PinService;
use crate::view::{RowView, TableView};

const DEFAULT_INPUT_MARKUP: &str = "<input type=\"text\" class=\"value-input\">";

type BrowserDashboard = Dashboard<BrowserTable, FetchPinService, BrowserScheduler>;

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

fn js_error_message(err: JsValue, fallback: &str) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    if let Ok(error) = err.dyn_into::<js_sys::Error>() {
        return error.message().into();
    }
    fallback.to_string()
}

fn view_error(err: JsValue) -> ScanError {
    ScanError::View(js_error_message(err, "DOM operation failed"))
}

fn set_hidden(el: &Element, hidden: bool) {
    if hidden {
        let _ = el.set_attribute("hidden", "");
    } else {
        let _ = el.remove_attribute("hidden");
    }
}

#[derive(Clone)]
pub struct BrowserRow {
    topic: Element,
    display: Element,
    editor: Element,
    edit_trigger: Option<Element>,
}

impl BrowserRow {
    fn input(&self) -> Option<Element> {
        self.editor
            .query_selector("input, textarea, select")
            .ok()
            .flatten()
    }
}

impl RowView for BrowserRow {
    fn set_value_text(&self, text: &str) {
        self.display.set_text_content(Some(text));
    }

    fn value_text(&self) -> String {
        self.display.text_content().unwrap_or_default()
    }

    fn set_stale(&self, stale: bool) {
        let _ = self.topic.class_list().toggle_with_force("stale", stale);
    }

    fn open_editor(&self, current: &str) {
        if let Some(input) = self.input() {
            match input.dyn_into::<HtmlInputElement>() {
                Ok(input) if input.type_() == "checkbox" => {
                    input.set_checked(current.trim().eq_ignore_ascii_case("true"));
                }
                Ok(input) => input.set_value(current),
                Err(other) => {
                    let _ = other.set_attribute("value", current);
                }
            }
        }
        set_hidden(&self.display, true);
        if let Some(trigger) = &self.edit_trigger {
            set_hidden(trigger, true);
        }
        set_hidden(&self.editor, false);
    }

    fn editor_input(&self) -> String {
        match self.input() {
            Some(input) => match input.dyn_into::<HtmlInputElement>() {
                Ok(input) if input.type_() == "checkbox" => input.checked().to_string(),
                Ok(input) => input.value(),
                Err(other) => other.get_attribute("value").unwrap_or_default(),
            },
            None => String::new(),
        }
    }

    fn close_editor(&self) {
        set_hidden(&self.editor, true);
        set_hidden(&self.display, false);
        if let Some(trigger) = &self.edit_trigger {
            set_hidden(trigger, false);
        }
    }
}

pub struct BrowserTable {
    document: Document,
    body: HtmlTableSectionElement,
    /// `#logList`; pages without a logs panel drop log lines.
    log_list: Option<Element>,
}

impl BrowserTable {
    fn create(&self, tag: &str, class: &str) -> ScanResult<Element> {
        let el = self.document.create_element(tag).map_err(view_error)?;
        el.set_class_name(class);
        Ok(el)
    }

    fn button(&self, label: &str, action: &str) -> ScanResult<Element> {
        let button = self.create("button", &format!("action-{}", action))?;
        button.set_text_content(Some(label));
        button
            .set_attribute("data-action", action)
            .map_err(view_error)?;
        Ok(button)
    }

    /// `<li>` with the local time and the message, both as plain text.
    fn log_item(&self, entry: &LogEntry) -> ScanResult<Element> {
        let item = self.create("li", "log-entry")?;
        item.set_attribute("data-timestamp", &entry.timestamp.to_string())
            .map_err(view_error)?;
        let stamp = js_sys::Date::new(&JsValue::from_f64(entry.timestamp as f64));
        let time = self.create("span", "log-time")?;
        time.set_text_content(Some(&String::from(stamp.to_locale_time_string("default"))));
        let message = self.create("span", "log-message")?;
        message.set_text_content(Some(&entry.message));
        item.append_child(&time).map_err(view_error)?;
        item.append_child(&message).map_err(view_error)?;
        Ok(item)
    }
}

impl TableView for BrowserTable {
    type Row = BrowserRow;

    fn append_row(&self, pin: &PinDescriptor) -> ScanResult<BrowserRow> {
        let tr = self
            .document
            .create_element("tr")
            .map_err(view_error)?
            .dyn_into::<HtmlTableRowElement>()
            .map_err(|_| ScanError::View("tr is not a table row".to_string()))?;
        tr.set_attribute("data-pin", &pin.name).map_err(view_error)?;

        let topic = self.create("td", "topic")?;
        topic.set_inner_html(&pin.html_template.topic);

        let value_cell = self.create("td", "value")?;
        let display = self.create("span", "value-display")?;
        display.set_inner_html(&pin.html_template.value);
        let editor = self.create("span", "value-editor")?;
        set_hidden(&editor, true);
        let _ = value_cell.append_child(&display);
        let _ = value_cell.append_child(&editor);

        let edit_trigger = if pin.writable {
            let markup = if pin.html_template.editable.trim().is_empty() {
                DEFAULT_INPUT_MARKUP
            } else {
                pin.html_template.editable.as_str()
            };
            editor.set_inner_html(markup);
            let _ = editor.append_child(&self.button("OK", "commit")?);
            let _ = editor.append_child(&self.button("Cancel", "cancel")?);
            let trigger = self.button("Edit", "edit")?;
            let _ = value_cell.append_child(&trigger);
            Some(trigger)
        } else {
            None
        };

        let _ = tr.append_child(&topic);
        let _ = tr.append_child(&value_cell);
        self.body.append_child(&tr).map_err(view_error)?;

        Ok(BrowserRow {
            topic,
            display,
            editor,
            edit_trigger,
        })
    }

    fn append_log(&self, entry: &LogEntry) {
        let Some(list) = &self.log_list else {
            return;
        };
        let appended = self
            .log_item(entry)
            .and_then(|item| list.append_child(&item).map_err(view_error));
        if let Err(err) = appended {
            warn!(%err, "failed to append log line");
        }
    }
}

pub struct FetchPinService {
    base_url: String,
}

impl FetchPinService {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let window = window().map_err(|err| anyhow!(js_error_message(err, "no window")))?;
        let result: Result<JsValue, JsValue> = async {
            let response = JsFuture::from(window.fetch_with_request(&request)).await?;
            let response: web_sys::Response = response.dyn_into()?;
            if !response.ok() {
                let text = JsFuture::from(response.text()?).await?;
                let message = text
                    .as_string()
                    .unwrap_or_else(|| format!("Request failed ({})", response.status()));
                return Err(JsValue::from_str(&message));
            }
            JsFuture::from(response.json()?).await
        }
        .await;
        let value = result.map_err(|err| anyhow!(js_error_message(err, "Request failed")))?;
        serde_wasm_bindgen::from_value(value).map_err(|err| anyhow!(err.to_string()))
    }
}

impl PinService for FetchPinService {
    async fn all_pins(&self) -> Result<Vec<PinDescriptor>> {
        let request = Request::new_with_str(&self.url("all_pins"))
            .map_err(|err| anyhow!(js_error_message(err, "Invalid request")))?;
        self.fetch(request).await
    }

    async fn pin_value(&self, payload: &PinValueRequest) -> Result<PinValueResponse> {
        let body = serde_json::to_string(payload)?;
        let init = RequestInit::new();
        init.set_method("POST");
        init.set_body(&JsValue::from_str(&body));
        let request = Request::new_with_str_and_init(&self.url("pin_value"), &init)
            .map_err(|err| anyhow!(js_error_message(err, "Invalid request")))?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|err| anyhow!(js_error_message(err, "Invalid header")))?;
        self.fetch(request).await
    }

    async fn logs(&self, since: u64) -> Result<Vec<LogEntry>> {
        let url = format!("{}?timestamp={}", self.url("logs"), since);
        let request = Request::new_with_str(&url)
            .map_err(|err| anyhow!(js_error_message(err, "Invalid request")))?;
        self.fetch(request).await
    }
}

#[derive(Clone, Copy, Default)]
pub struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
    type Timer = Interval;

    fn every(&self, period: Duration, mut tick: Box<dyn FnMut()>) -> Interval {
        let millis = u32::try_from(period.as_millis()).unwrap_or(u32::MAX);
        Interval::new(millis, move || tick())
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        spawn_local(task);
    }
}

struct CanvasPanels {
    document: Document,
    container: Element,
}

impl PanelHost for CanvasPanels {
    type Handle = Element;

    fn mount(&self, id: PanelId) -> ScanResult<Element> {
        let wrapper = self.document.create_element("div").map_err(view_error)?;
        wrapper.set_class_name("canvas-wrapper");
        wrapper
            .set_attribute("data-panel-id", &id.0.to_string())
            .map_err(view_error)?;
        wrapper.set_inner_html(
            "<button class=\"removeCanvas\" data-action=\"remove-panel\">Remove Canvas</button>\
             <canvas></canvas>",
        );
        self.container.append_child(&wrapper).map_err(view_error)?;
        Ok(wrapper)
    }

    fn unmount(&self, handle: Element) {
        handle.remove();
    }
}

/// Buffers one formatted event and hands it to `console.log` on drop.
#[derive(Default)]
struct ConsoleWriter {
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buffer);
        web_sys::console::log_1(&JsValue::from_str(text.trim_end()));
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_writer(ConsoleWriter::default)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            web_sys::console::error_1(&JsValue::from_str(&format!("panic: {info}")));
        }));
    });
}

/// Selected refresh option, overridable with `?refresh=<ms>`; `?overlap=discard`
/// drops superseded reads.
fn read_client_config(window: &web_sys::Window, select: Option<&HtmlSelectElement>) -> ClientConfig {
    let search = window.location().search().unwrap_or_default();
    let params = web_sys::UrlSearchParams::new_with_str(&search).ok();
    let param = |key: &str| params.as_ref().and_then(|params| params.get(key));

    let refresh_ms = param("refresh")
        .or_else(|| select.map(HtmlSelectElement::value))
        .map(|value| parse_refresh_ms(&value))
        .unwrap_or_else(|| ClientConfig::default().refresh_ms);
    let overlap = match param("overlap").as_deref() {
        Some("discard") => OverlapPolicy::DiscardSuperseded,
        _ => OverlapPolicy::LastArrivalWins,
    };

    ClientConfig::default()
        .with_refresh_ms(refresh_ms)
        .with_overlap(overlap)
}

fn pin_action(event: &web_sys::Event) -> Option<(String, String)> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let action_el = target.closest("[data-action]").ok().flatten()?;
    let action = action_el.get_attribute("data-action")?;
    let row = action_el.closest("tr[data-pin]").ok().flatten()?;
    let name = row.get_attribute("data-pin")?;
    Some((action, name))
}

fn handle_pin_action(dashboard: &BrowserDashboard, action: &str, name: &str) {
    let result = match action {
        "edit" => dashboard.begin_edit(name),
        "commit" => dashboard.commit_edit(name),
        "cancel" => dashboard.cancel_edit(name),
        _ => return,
    };
    if let Err(err) = result {
        warn!(pin = %name, action, %err, "edit action rejected");
    }
}

fn on<F>(target: &web_sys::EventTarget, event_name: &str, handler: F)
where
    F: FnMut(web_sys::Event) + 'static,
{
    let handler = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
    let _ = target.add_event_listener_with_callback(event_name, handler.as_ref().unchecked_ref());
    handler.forget();
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    install_panic_hook();
    init_logging();

    let window = window()?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let body = document
        .query_selector("#variablesTable tbody")?
        .ok_or_else(|| JsValue::from_str("missing #variablesTable tbody"))?
        .dyn_into::<HtmlTableSectionElement>()?;
    let select = document
        .get_element_by_id("refreshRate")
        .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok());

    let config = read_client_config(&window, select.as_ref());
    if let Some(select) = &select {
        select.set_value(&config.refresh_ms.to_string());
    }

    let table = BrowserTable {
        document: document.clone(),
        body: body.clone(),
        log_list: document.get_element_by_id("logList"),
    };
    let service = FetchPinService {
        base_url: config.base_url.clone(),
    };
    let dashboard = Dashboard::new(table, service, BrowserScheduler, &config);
    dashboard.start(config.refresh_ms);

    if let Some(button) = document.get_element_by_id("refreshButton") {
        let dashboard = dashboard.clone();
        on(&button, "click", move |_event| dashboard.trigger_once());
    }

    if let Some(select) = select {
        let dashboard = dashboard.clone();
        let target = select.clone();
        on(&select, "change", move |_event| {
            let refresh_ms = parse_refresh_ms(&target.value());
            info!(refresh_ms, "refresh rate changed");
            dashboard.set_interval(refresh_ms);
        });
    }

    {
        let dashboard = dashboard.clone();
        on(&body, "click", move |event| {
            if let Some((action, name)) = pin_action(&event) {
                handle_pin_action(&dashboard, &action, &name);
            }
        });
    }

    {
        let dashboard = dashboard.clone();
        on(&body, "keydown", move |event| {
            let key = match event.dyn_ref::<web_sys::KeyboardEvent>() {
                Some(key_event) => key_event.key(),
                None => return,
            };
            let action = match key.as_str() {
                "Enter" => "commit",
                "Escape" => "cancel",
                _ => return,
            };
            let name = event
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .filter(|target| target.closest(".value-editor").ok().flatten().is_some())
                .and_then(|target| target.closest("tr[data-pin]").ok().flatten())
                .and_then(|row| row.get_attribute("data-pin"));
            if let Some(name) = name {
                event.prevent_default();
                handle_pin_action(&dashboard, action, &name);
            }
        });
    }

    if let Some(container) = document.get_element_by_id("canvasContainer") {
        let panels = Rc::new(RefCell::new(PanelManager::new(CanvasPanels {
            document: document.clone(),
            container: container.clone(),
        })));

        if let Some(button) = document.get_element_by_id("addCanvas") {
            let panels = Rc::clone(&panels);
            on(&button, "click", move |_event| {
                if let Err(err) = panels.borrow_mut().add_panel() {
                    warn!(%err, "failed to add canvas panel");
                }
            });
        }

        on(&container, "click", move |event| {
            let panel_id = event
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .filter(|target| target.closest("[data-action=\"remove-panel\"]").ok().flatten().is_some())
                .and_then(|target| target.closest(".canvas-wrapper").ok().flatten())
                .and_then(|wrapper| wrapper.get_attribute("data-panel-id"))
                .and_then(|id| id.parse::<u32>().ok());
            if let Some(id) = panel_id {
                panels.borrow_mut().remove_panel(PanelId(id));
            }
        });
    }

    Ok(())
}
