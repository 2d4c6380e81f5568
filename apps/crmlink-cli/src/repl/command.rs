//! Menu commands and their dispatch table

/// An option of the post-sign-in menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuCommand {
    CallRest,
    CallProxy,
    Refresh,
    Exit,
}

/// One row of the menu
#[derive(Debug, Clone, Copy)]
pub struct MenuEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub command: MenuCommand,
}

/// Menu rows in display order.
pub static MENU: [MenuEntry; 4] = [
    MenuEntry {
        key: "1",
        label: "Call Rest API",
        command: MenuCommand::CallRest,
    },
    MenuEntry {
        key: "2",
        label: "Call NetServer Proxies",
        command: MenuCommand::CallProxy,
    },
    MenuEntry {
        key: "3",
        label: "Refresh token",
        command: MenuCommand::Refresh,
    },
    MenuEntry {
        key: "4",
        label: "Exit",
        command: MenuCommand::Exit,
    },
];

impl MenuCommand {
    /// Look up the command for a typed choice.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        MENU.iter()
            .find(|entry| entry.key == input)
            .map(|entry| entry.command)
    }

    pub fn entry(self) -> &'static MenuEntry {
        match self {
            MenuCommand::CallRest => &MENU[0],
            MenuCommand::CallProxy => &MENU[1],
            MenuCommand::Refresh => &MENU[2],
            MenuCommand::Exit => &MENU[3],
        }
    }
}
