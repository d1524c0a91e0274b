mod helpers;
mod log;
mod note;
mod prep;
mod recipe;
mod scan;
mod stock;
mod suggest;

pub(crate) use log::{
    cmd_log_add, cmd_log_delete, cmd_log_list, cmd_log_set_notes, cmd_log_set_quantity,
    cmd_log_set_servings,
};
pub(crate) use note::cmd_note;
pub(crate) use prep::{cmd_prep_check, cmd_prep_complete, cmd_prep_sheet};
pub(crate) use recipe::{cmd_recipe_add, cmd_recipe_list, cmd_recipe_set_prepared, cmd_recipe_show};
pub(crate) use scan::cmd_scan;
pub(crate) use stock::{
    cmd_stock_add, cmd_stock_categories, cmd_stock_import, cmd_stock_list, cmd_stock_set,
};
pub(crate) use suggest::{cmd_suggest_list, cmd_suggest_set};
