use serde::{Deserialize, Serialize};

use crate::application::display::DisplayItem;

/// One rendered tree row as sent to API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemDto {
    pub label: String,
    pub address: u64,
    pub kind: String,
    pub children: Vec<ItemDto>,
}

impl From<&DisplayItem> for ItemDto {
    fn from(item: &DisplayItem) -> Self {
        ItemDto {
            label: item.label.clone(),
            address: item.node.address,
            kind: item.node.kind.name().to_string(),
            children: item.children.iter().map(ItemDto::from).collect(),
        }
    }
}

pub fn items_dto(items: &[DisplayItem]) -> Vec<ItemDto> {
    items.iter().map(ItemDto::from).collect()
}

/// Both trees for the currently focused function.
#[derive(Debug, Serialize, Deserialize)]
pub struct FocusDto {
    pub function: String,
    pub address: u64,
    pub incoming: Vec<ItemDto>,
    pub outgoing: Vec<ItemDto>,
}
