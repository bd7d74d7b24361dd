//! Canvas panels shown next to the pin table. Independent of pin data.

use crate::error::ScanResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PanelId(pub u32);

/// Where panels get mounted, e.g. the page's canvas container.
pub trait PanelHost {
    type Handle;

    fn mount(&self, id: PanelId) -> ScanResult<Self::Handle>;
    fn unmount(&self, handle: Self::Handle);
}

pub struct PanelManager<H: PanelHost> {
    host: H,
    next_id: u32,
    panels: Vec<(PanelId, H::Handle)>,
}

impl<H: PanelHost> PanelManager<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            next_id: 1,
            panels: Vec::new(),
        }
    }

    pub fn add_panel(&mut self) -> ScanResult<PanelId> {
        let id = PanelId(self.next_id);
        let handle = self.host.mount(id)?;
        self.next_id += 1;
        self.panels.push((id, handle));
        Ok(id)
    }

    /// Returns false if no panel has this id.
    pub fn remove_panel(&mut self, id: PanelId) -> bool {
        match self.panels.iter().position(|(panel_id, _)| *panel_id == id) {
            Some(index) => {
                let (_, handle) = self.panels.remove(index);
                self.host.unmount(handle);
                true
            }
            None => false,
        }
    }

    pub fn ids(&self) -> Vec<PanelId> {
        self.panels.iter().map(|(id, _)| *id).collect()
    }
}
