use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Terminal,
    Mocha,
    TokyoNightStorm,
    GruvboxDarkHard,
    Nord,
    Dracula,
}

pub const THEME_ORDER: [Theme; 6] = [
    Theme::Terminal,
    Theme::Mocha,
    Theme::TokyoNightStorm,
    Theme::GruvboxDarkHard,
    Theme::Nord,
    Theme::Dracula,
];

impl Theme {
    pub fn label(self) -> &'static str {
        match self {
            Theme::Terminal => "Terminal",
            Theme::Mocha => "Mocha",
            Theme::TokyoNightStorm => "Tokyo Night",
            Theme::GruvboxDarkHard => "Gruvbox",
            Theme::Nord => "Nord",
            Theme::Dracula => "Dracula",
        }
    }

    pub fn next(self) -> Self {
        let idx = THEME_ORDER.iter().position(|t| *t == self).unwrap_or(0);
        THEME_ORDER[(idx + 1) % THEME_ORDER.len()]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub border_active: Color,
    pub border_inactive: Color,
    pub selection_bg: Color,
    pub match_bg: Color,
    pub menu_bg: Color,
    pub hash: Color,
    pub author: Color,
    pub date: Color,
    pub ref_local: Color,
    pub ref_remote: Color,
    pub ref_tag: Color,
    pub ref_head: Color,
    pub boundary: Color,
    pub error: Color,
    pub diff_add_fg: Color,
    pub diff_del_fg: Color,
    pub diff_add_bg: Color,
    pub diff_del_bg: Color,
    pub diff_hunk_bg: Color,
    pub diff_meta: Color,
}

fn tint(base: Color, overlay: Color, alpha: f32) -> Color {
    let (Color::Rgb(br, bg, bb), Color::Rgb(or, og, ob)) = (base, overlay) else {
        return base;
    };
    let mix = |b: u8, o: u8| -> u8 {
        let b = b as f32;
        let v = b + (o as f32 - b) * alpha;
        v.round().clamp(0.0, 255.0) as u8
    };
    Color::Rgb(mix(br, or), mix(bg, og), mix(bb, ob))
}

/// The handful of colours each scheme defines; everything else is derived.
struct Scheme {
    bg: (u8, u8, u8),
    fg: (u8, u8, u8),
    primary: (u8, u8, u8),
    secondary: (u8, u8, u8),
    tertiary: (u8, u8, u8),
    muted: (u8, u8, u8),
    selection: (u8, u8, u8),
    menu: (u8, u8, u8),
    green: (u8, u8, u8),
    red: (u8, u8, u8),
}

fn scheme(theme: Theme) -> Scheme {
    match theme {
        Theme::Terminal => Scheme {
            bg: (22, 22, 22),
            fg: (212, 212, 212),
            primary: (97, 175, 239),
            secondary: (229, 192, 123),
            tertiary: (198, 120, 221),
            muted: (92, 99, 112),
            selection: (55, 55, 55),
            menu: (38, 38, 38),
            green: (152, 195, 121),
            red: (224, 108, 117),
        },
        Theme::Mocha => Scheme {
            bg: (30, 30, 46),
            fg: (248, 248, 255),
            primary: (203, 166, 247),
            secondary: (250, 179, 135),
            tertiary: (137, 180, 250),
            muted: (120, 124, 150),
            selection: (78, 82, 110),
            menu: (58, 60, 82),
            green: (166, 227, 161),
            red: (243, 139, 168),
        },
        Theme::TokyoNightStorm => Scheme {
            bg: (36, 40, 59),
            fg: (192, 202, 245),
            primary: (122, 162, 247),
            secondary: (255, 158, 100),
            tertiary: (187, 154, 247),
            muted: (86, 95, 137),
            selection: (46, 60, 100),
            menu: (45, 49, 71),
            green: (158, 206, 106),
            red: (247, 118, 142),
        },
        Theme::GruvboxDarkHard => Scheme {
            bg: (29, 32, 33),
            fg: (235, 219, 178),
            primary: (250, 189, 47),
            secondary: (214, 93, 14),
            tertiary: (131, 165, 152),
            muted: (146, 131, 116),
            selection: (60, 56, 54),
            menu: (50, 48, 47),
            green: (184, 187, 38),
            red: (251, 73, 52),
        },
        Theme::Nord => Scheme {
            bg: (46, 52, 64),
            fg: (216, 222, 233),
            primary: (136, 192, 208),
            secondary: (235, 203, 139),
            tertiary: (180, 142, 173),
            muted: (76, 86, 106),
            selection: (67, 76, 94),
            menu: (59, 66, 82),
            green: (163, 190, 140),
            red: (191, 97, 106),
        },
        Theme::Dracula => Scheme {
            bg: (40, 42, 54),
            fg: (248, 248, 242),
            primary: (189, 147, 249),
            secondary: (139, 233, 253),
            tertiary: (255, 121, 198),
            muted: (98, 114, 164),
            selection: (68, 71, 90),
            menu: (68, 71, 90),
            green: (80, 250, 123),
            red: (255, 85, 85),
        },
    }
}

pub fn palette(theme: Theme) -> Palette {
    let rgb = |(r, g, b): (u8, u8, u8)| Color::Rgb(r, g, b);
    let s = scheme(theme);
    let bg = rgb(s.bg);
    let primary = rgb(s.primary);
    let secondary = rgb(s.secondary);
    let green = rgb(s.green);
    let red = rgb(s.red);

    Palette {
        bg,
        fg: rgb(s.fg),
        muted: rgb(s.muted),
        accent: primary,
        border_active: primary,
        border_inactive: tint(rgb(s.muted), bg, 0.3),
        selection_bg: rgb(s.selection),
        match_bg: tint(bg, secondary, 0.30),
        menu_bg: rgb(s.menu),
        hash: secondary,
        author: rgb(s.tertiary),
        date: rgb(s.muted),
        ref_local: green,
        ref_remote: red,
        ref_tag: secondary,
        ref_head: primary,
        boundary: rgb(s.muted),
        error: red,
        diff_add_fg: green,
        diff_del_fg: red,
        diff_add_bg: tint(bg, green, 0.20),
        diff_del_bg: tint(bg, red, 0.20),
        diff_hunk_bg: tint(bg, primary, 0.12),
        diff_meta: rgb(s.tertiary),
    }
}
