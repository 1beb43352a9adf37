//! Accessibility element kinds.
//!
//! [`ElementKind`] mirrors the fixed enumeration of element types reported by
//! the platform accessibility tree. Kinds are written to and read from tree
//! dumps by their PascalCase name (`"Button"`, `"StaticText"`, ...). Parsing is
//! lenient: names the enumeration does not know become [`ElementKind::Other`],
//! which is also what the platform reports for untyped containers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! element_kinds {
    ($($variant:ident = $code:literal => $name:literal,)+) => {
        /// The type of a UI element in the accessibility hierarchy.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ElementKind {
            $($variant,)+
        }

        impl ElementKind {
            /// Every kind, in numeric order.
            pub const ALL: &'static [ElementKind] = &[$(ElementKind::$variant,)+];

            /// The numeric code the platform uses for this kind.
            pub fn code(self) -> u16 {
                match self {
                    $(ElementKind::$variant => $code,)+
                }
            }

            /// Looks a kind up by its numeric code.
            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(ElementKind::$variant),)+
                    _ => None,
                }
            }

            /// The PascalCase name used in tree dumps.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(ElementKind::$variant => $name,)+
                }
            }
        }

        impl FromStr for ElementKind {
            type Err = UnknownKind;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(ElementKind::$variant),)+
                    _ => Err(UnknownKind(s.to_string())),
                }
            }
        }
    };
}

element_kinds! {
    Any = 0 => "Any",
    Other = 1 => "Other",
    Application = 2 => "Application",
    Group = 3 => "Group",
    Window = 4 => "Window",
    Sheet = 5 => "Sheet",
    Drawer = 6 => "Drawer",
    Alert = 7 => "Alert",
    Dialog = 8 => "Dialog",
    Button = 9 => "Button",
    RadioButton = 10 => "RadioButton",
    RadioGroup = 11 => "RadioGroup",
    CheckBox = 12 => "CheckBox",
    DisclosureTriangle = 13 => "DisclosureTriangle",
    PopUpButton = 14 => "PopUpButton",
    ComboBox = 15 => "ComboBox",
    MenuButton = 16 => "MenuButton",
    ToolbarButton = 17 => "ToolbarButton",
    Popover = 18 => "Popover",
    Keyboard = 19 => "Keyboard",
    Key = 20 => "Key",
    NavigationBar = 21 => "NavigationBar",
    TabBar = 22 => "TabBar",
    TabGroup = 23 => "TabGroup",
    Toolbar = 24 => "Toolbar",
    StatusBar = 25 => "StatusBar",
    Table = 26 => "Table",
    TableRow = 27 => "TableRow",
    TableColumn = 28 => "TableColumn",
    Outline = 29 => "Outline",
    OutlineRow = 30 => "OutlineRow",
    Browser = 31 => "Browser",
    CollectionView = 32 => "CollectionView",
    Slider = 33 => "Slider",
    PageIndicator = 34 => "PageIndicator",
    ProgressIndicator = 35 => "ProgressIndicator",
    ActivityIndicator = 36 => "ActivityIndicator",
    SegmentedControl = 37 => "SegmentedControl",
    Picker = 38 => "Picker",
    PickerWheel = 39 => "PickerWheel",
    Switch = 40 => "Switch",
    Toggle = 41 => "Toggle",
    Link = 42 => "Link",
    Image = 43 => "Image",
    Icon = 44 => "Icon",
    SearchField = 45 => "SearchField",
    ScrollView = 46 => "ScrollView",
    ScrollBar = 47 => "ScrollBar",
    StaticText = 48 => "StaticText",
    TextField = 49 => "TextField",
    SecureTextField = 50 => "SecureTextField",
    DatePicker = 51 => "DatePicker",
    TextView = 52 => "TextView",
    Menu = 53 => "Menu",
    MenuItem = 54 => "MenuItem",
    MenuBar = 55 => "MenuBar",
    MenuBarItem = 56 => "MenuBarItem",
    Map = 57 => "Map",
    WebView = 58 => "WebView",
    IncrementArrow = 59 => "IncrementArrow",
    DecrementArrow = 60 => "DecrementArrow",
    Timeline = 61 => "Timeline",
    RatingIndicator = 62 => "RatingIndicator",
    ValueIndicator = 63 => "ValueIndicator",
    SplitGroup = 64 => "SplitGroup",
    Splitter = 65 => "Splitter",
    RelevanceIndicator = 66 => "RelevanceIndicator",
    ColorWell = 67 => "ColorWell",
    HelpTag = 68 => "HelpTag",
    Matte = 69 => "Matte",
    DockItem = 70 => "DockItem",
    Ruler = 71 => "Ruler",
    RulerMarker = 72 => "RulerMarker",
    Grid = 73 => "Grid",
    LevelIndicator = 74 => "LevelIndicator",
    Cell = 75 => "Cell",
    LayoutArea = 76 => "LayoutArea",
    LayoutItem = 77 => "LayoutItem",
    Handle = 78 => "Handle",
    Stepper = 79 => "Stepper",
    Tab = 80 => "Tab",
    TouchBar = 81 => "TouchBar",
    StatusItem = 82 => "StatusItem",
}

impl ElementKind {
    /// Whether declared elements of this kind may carry child declarations.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            ElementKind::Other
                | ElementKind::Group
                | ElementKind::Window
                | ElementKind::Sheet
                | ElementKind::Alert
                | ElementKind::NavigationBar
                | ElementKind::TabBar
                | ElementKind::Table
                | ElementKind::CollectionView
                | ElementKind::ScrollView
                | ElementKind::Cell
        )
    }

    /// Parses a dump name, falling back to [`ElementKind::Other`].
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(ElementKind::Other)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`ElementKind::from_str`] for names outside the enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown element kind '{0}'")]
pub struct UnknownKind(pub String);

impl Serialize for ElementKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ElementKind::parse_lenient(&name))
    }
}
