use crate::sysfs::{Attribute, Node};

/// The four handles of a line, each independently open or closed
#[derive(Debug)]
pub(crate) struct Handles<N> {
    value: Option<N>,
    active_low: Option<N>,
    direction: Option<N>,
    edge: Option<N>,
}

impl<N: Node> Handles<N> {
    pub(crate) const fn closed() -> Self {
        Self {
            value: None,
            active_low: None,
            direction: None,
            edge: None,
        }
    }

    pub(crate) fn get(&self, attribute: Attribute) -> Option<&N> {
        match attribute {
            Attribute::Value => self.value.as_ref(),
            Attribute::ActiveLow => self.active_low.as_ref(),
            Attribute::Direction => self.direction.as_ref(),
            Attribute::Edge => self.edge.as_ref(),
        }
    }

    pub(crate) fn slot(&mut self, attribute: Attribute) -> &mut Option<N> {
        match attribute {
            Attribute::Value => &mut self.value,
            Attribute::ActiveLow => &mut self.active_low,
            Attribute::Direction => &mut self.direction,
            Attribute::Edge => &mut self.edge,
        }
    }

    pub(crate) fn get_mut(&mut self, attribute: Attribute) -> Option<&mut N> {
        self.slot(attribute).as_mut()
    }

    /// Close whatever is open, returning the attributes that were.
    pub(crate) fn close_all(&mut self) -> heapless::Vec<Attribute, 4> {
        let mut closed = heapless::Vec::new();
        for attribute in [
            Attribute::Value,
            Attribute::ActiveLow,
            Attribute::Direction,
            Attribute::Edge,
        ] {
            if self.slot(attribute).take().is_some() {
                // Capacity matches the number of attributes
                let _ = closed.push(attribute);
            }
        }
        closed
    }
}
