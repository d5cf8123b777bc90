use crate::internal::ui::app::Command;
use crate::internal::ui::keybindings::{KeyBindingContext, KeyBindingMap};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Create default keybindings for the application
pub fn create_default_keybindings() -> KeyBindingMap {
    let mut map = KeyBindingMap::new();

    add_global_bindings(&mut map);
    add_list_bindings(&mut map);
    add_categories_bindings(&mut map);
    add_detail_bindings(&mut map);

    map
}

fn add_global_bindings(map: &mut KeyBindingMap) {
    let ctx = KeyBindingContext::Global;

    map.add_binding(ctx, key('?'), Command::ToggleHelp);
    map.add_binding(
        ctx,
        KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        Command::Quit,
    );

    // Quit / Back
    map.add_binding(ctx, key('q'), Command::Back);
    map.add_binding(ctx, key_code(KeyCode::Esc), Command::Back);

    // Navigation
    map.add_binding(ctx, key('j'), Command::NavigateDown);
    map.add_binding(ctx, key('k'), Command::NavigateUp);
    map.add_binding(ctx, key_code(KeyCode::Down), Command::NavigateDown);
    map.add_binding(ctx, key_code(KeyCode::Up), Command::NavigateUp);
    map.add_binding(ctx, key_code(KeyCode::Enter), Command::Enter);
    map.add_binding(ctx, key_code(KeyCode::Tab), Command::ToggleFocus);

    map.add_binding(ctx, key('/'), Command::OpenSearch);
    map.add_binding(ctx, key('f'), Command::ToggleFavorite);
    map.add_binding(ctx, key('t'), Command::SwitchTheme);
    map.add_binding(ctx, key('o'), Command::OpenBrowser);
    map.add_binding(ctx, key('r'), Command::Retry);
}

fn add_list_bindings(map: &mut KeyBindingMap) {
    let ctx = KeyBindingContext::List;

    map.add_binding(ctx, key('q'), Command::Quit);
    map.add_binding(ctx, key_code(KeyCode::Esc), Command::Quit);

    // Paging
    map.add_binding(ctx, key('n'), Command::NextPage);
    map.add_binding(ctx, key('p'), Command::PrevPage);
    map.add_binding(ctx, key_code(KeyCode::Right), Command::NextPage);
    map.add_binding(ctx, key_code(KeyCode::Left), Command::PrevPage);
    map.add_binding(ctx, key('m'), Command::LoadMore);

    map.add_binding(ctx, key('s'), Command::ToggleSort);
    map.add_binding(ctx, key('x'), Command::ClearFilters);
}

fn add_categories_bindings(map: &mut KeyBindingMap) {
    let ctx = KeyBindingContext::Categories;

    map.add_binding(ctx, key('s'), Command::ToggleSort);
    map.add_binding(ctx, key('x'), Command::ClearFilters);
    map.add_binding(ctx, key_code(KeyCode::Right), Command::ToggleFocus);
}

fn add_detail_bindings(map: &mut KeyBindingMap) {
    let ctx = KeyBindingContext::Detail;

    map.add_binding(ctx, key_code(KeyCode::Backspace), Command::Back);
    map.add_binding(ctx, key_code(KeyCode::Left), Command::Back);
}

fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty())
}

fn key_code(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::empty())
}
