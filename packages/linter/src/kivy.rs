//! Bundled widget and canvas instruction tables for stock Kivy classes

use crate::registry::PropertyKind::{self, *};
use crate::registry::WidgetInfo;

// `Option` and `String` below are property kinds, not the std types

const fn widget(
    name: &'static str,
    parent: std::option::Option<&'static str>,
    properties: &'static [(&'static str, PropertyKind)],
) -> WidgetInfo<'static> {
    WidgetInfo {
        name,
        parent,
        properties,
    }
}

pub static KIVY_WIDGETS: &[WidgetInfo<'static>] = &[
    widget(
        "Widget",
        None,
        &[
            ("x", Numeric),
            ("y", Numeric),
            ("width", Numeric),
            ("height", Numeric),
            ("pos", ReferenceList),
            ("size", ReferenceList),
            ("size_hint", ReferenceList),
            ("size_hint_x", Numeric),
            ("size_hint_y", Numeric),
            ("size_hint_min", ReferenceList),
            ("size_hint_min_x", Numeric),
            ("size_hint_min_y", Numeric),
            ("size_hint_max", ReferenceList),
            ("size_hint_max_x", Numeric),
            ("size_hint_max_y", Numeric),
            ("pos_hint", Object),
            ("center", ReferenceList),
            ("center_x", Alias),
            ("center_y", Alias),
            ("right", Alias),
            ("top", Alias),
            ("ids", Dict),
            ("opacity", Numeric),
            ("disabled", Alias),
            ("parent", Object),
            ("children", List),
            ("cls", List),
            ("motion_filter", Dict),
        ],
    ),
    widget(
        "Label",
        Some("Widget"),
        &[
            ("text", String),
            ("text_size", List),
            ("base_direction", Option),
            ("text_language", String),
            ("font_context", String),
            ("font_family", String),
            ("font_name", String),
            ("font_size", Numeric),
            ("font_features", String),
            ("line_height", Numeric),
            ("bold", Boolean),
            ("italic", Boolean),
            ("underline", Boolean),
            ("strikethrough", Boolean),
            ("padding", VariableList),
            ("padding_x", Numeric),
            ("padding_y", Numeric),
            ("halign", Option),
            ("valign", Option),
            ("color", Color),
            ("outline_width", Numeric),
            ("outline_color", Color),
            ("disabled_color", Color),
            ("disabled_outline_color", Color),
            ("texture", Object),
            ("texture_size", List),
            ("mipmap", Boolean),
            ("shorten", Boolean),
            ("shorten_from", Option),
            ("is_shortened", Boolean),
            ("split_str", String),
            ("ellipsis_options", Dict),
            ("unicode_errors", Option),
            ("markup", Boolean),
            ("refs", Dict),
            ("anchors", Dict),
            ("max_lines", Numeric),
            ("strip", Boolean),
            ("font_blended", Boolean),
            ("font_hinting", Option),
            ("font_kerning", Boolean),
        ],
    ),
    widget(
        "ButtonBehavior",
        None,
        &[
            ("state", Option),
            ("last_touch", Object),
            ("min_state_time", Numeric),
            ("always_release", Boolean),
        ],
    ),
    widget(
        "ToggleButtonBehavior",
        Some("ButtonBehavior"),
        &[("group", Object), ("allow_no_selection", Boolean)],
    ),
    widget(
        "FocusBehavior",
        None,
        &[
            ("focus", Boolean),
            ("focused", Boolean),
            ("focus_next", Object),
            ("focus_previous", Object),
            ("keyboard", Alias),
            ("keyboard_mode", Option),
            ("keyboard_on_key_down", Object),
            ("unfocus_on_touch", Boolean),
            ("is_focusable", Boolean),
        ],
    ),
    widget(
        "Button",
        Some("Label"),
        &[
            ("state", Option),
            ("last_touch", Object),
            ("min_state_time", Numeric),
            ("always_release", Boolean),
            ("background_color", Color),
            ("background_normal", String),
            ("background_down", String),
            ("background_disabled_normal", String),
            ("background_disabled_down", String),
            ("border", List),
        ],
    ),
    widget(
        "ToggleButton",
        Some("Button"),
        &[("group", Object), ("allow_no_selection", Boolean)],
    ),
    widget(
        "CheckBox",
        Some("ToggleButton"),
        &[
            ("active", Boolean),
            ("color", Color),
            ("background_checkbox_normal", String),
            ("background_checkbox_down", String),
            ("background_radio_normal", String),
            ("background_radio_down", String),
        ],
    ),
    widget(
        "Image",
        Some("Widget"),
        &[
            ("source", String),
            ("texture", Object),
            ("texture_size", List),
            ("color", Color),
            ("fit_mode", Option),
            ("allow_stretch", Boolean),
            ("keep_ratio", Boolean),
            ("keep_data", Boolean),
            ("anim_delay", Numeric),
            ("anim_loop", Numeric),
            ("nocache", Boolean),
            ("mipmap", Boolean),
            ("norm_image_size", Alias),
            ("image_ratio", Alias),
        ],
    ),
    widget("AsyncImage", Some("Image"), &[]),
    widget(
        "TextInput",
        Some("Widget"),
        &[
            ("text", Alias),
            ("hint_text", Alias),
            ("hint_text_color", Color),
            ("multiline", Boolean),
            ("password", Boolean),
            ("password_mask", String),
            ("readonly", Boolean),
            ("font_name", String),
            ("font_size", Numeric),
            ("font_context", String),
            ("font_family", String),
            ("line_height", Numeric),
            ("line_spacing", Numeric),
            ("tab_width", Numeric),
            ("padding", VariableList),
            ("halign", Option),
            ("foreground_color", Color),
            ("background_color", Color),
            ("background_normal", String),
            ("background_active", String),
            ("background_disabled_normal", String),
            ("disabled_foreground_color", Color),
            ("cursor", Alias),
            ("cursor_color", Color),
            ("cursor_width", Numeric),
            ("cursor_blink", Boolean),
            ("selection_color", Color),
            ("selection_text", String),
            ("input_filter", Object),
            ("input_type", Option),
            ("keyboard_suggestions", Boolean),
            ("write_tab", Boolean),
            ("focus", Boolean),
            ("use_bubble", Boolean),
            ("use_handles", Boolean),
            ("allow_copy", Boolean),
            ("auto_indent", Boolean),
            ("do_wrap", Boolean),
            ("minimum_height", Alias),
            ("scroll_x", Numeric),
            ("scroll_y", Numeric),
            ("text_validate_unfocus", Boolean),
            ("replace_crlf", Boolean),
        ],
    ),
    widget(
        "Slider",
        Some("Widget"),
        &[
            ("value", Numeric),
            ("min", Numeric),
            ("max", Numeric),
            ("step", BoundedNumeric),
            ("range", ReferenceList),
            ("padding", Numeric),
            ("orientation", Option),
            ("value_normalized", Alias),
            ("value_pos", Alias),
            ("sensitivity", Option),
            ("background_width", Numeric),
            ("cursor_image", String),
            ("cursor_size", List),
            ("value_track", Boolean),
            ("value_track_color", Color),
            ("value_track_width", Numeric),
        ],
    ),
    widget(
        "ProgressBar",
        Some("Widget"),
        &[("value", Alias), ("value_normalized", Alias), ("max", Numeric)],
    ),
    widget("Switch", Some("Widget"), &[("active", Boolean), ("active_norm_pos", Numeric)]),
    widget(
        "Spinner",
        Some("Button"),
        &[
            ("values", List),
            ("text_autoupdate", Boolean),
            ("option_cls", Object),
            ("dropdown_cls", Object),
            ("is_open", Boolean),
            ("sync_height", Boolean),
        ],
    ),
    widget("Layout", Some("Widget"), &[]),
    widget(
        "BoxLayout",
        Some("Layout"),
        &[
            ("orientation", Option),
            ("spacing", Numeric),
            ("padding", VariableList),
            ("minimum_width", Numeric),
            ("minimum_height", Numeric),
            ("minimum_size", ReferenceList),
        ],
    ),
    widget("FloatLayout", Some("Layout"), &[]),
    widget("RelativeLayout", Some("FloatLayout"), &[]),
    widget(
        "AnchorLayout",
        Some("Layout"),
        &[
            ("anchor_x", Option),
            ("anchor_y", Option),
            ("padding", VariableList),
        ],
    ),
    widget(
        "GridLayout",
        Some("Layout"),
        &[
            ("cols", BoundedNumeric),
            ("rows", BoundedNumeric),
            ("spacing", VariableList),
            ("padding", VariableList),
            ("orientation", Option),
            ("col_default_width", Numeric),
            ("row_default_height", Numeric),
            ("col_force_default", Boolean),
            ("row_force_default", Boolean),
            ("cols_minimum", Dict),
            ("rows_minimum", Dict),
            ("minimum_width", Numeric),
            ("minimum_height", Numeric),
            ("minimum_size", ReferenceList),
        ],
    ),
    widget(
        "StackLayout",
        Some("Layout"),
        &[
            ("spacing", VariableList),
            ("padding", VariableList),
            ("orientation", Option),
            ("minimum_width", Numeric),
            ("minimum_height", Numeric),
            ("minimum_size", ReferenceList),
        ],
    ),
    widget("PageLayout", Some("Layout"), &[("page", Numeric), ("border", Numeric), ("swipe_threshold", Numeric)]),
    widget("StencilView", Some("Widget"), &[]),
    widget(
        "ScrollView",
        Some("StencilView"),
        &[
            ("do_scroll_x", Boolean),
            ("do_scroll_y", Boolean),
            ("do_scroll", Alias),
            ("scroll_x", Numeric),
            ("scroll_y", Numeric),
            ("scroll_distance", Numeric),
            ("scroll_timeout", Numeric),
            ("scroll_type", Option),
            ("scroll_wheel_distance", Numeric),
            ("smooth_scroll_end", Numeric),
            ("always_overscroll", Boolean),
            ("bar_color", Color),
            ("bar_inactive_color", Color),
            ("bar_margin", Numeric),
            ("bar_pos", ReferenceList),
            ("bar_pos_x", Option),
            ("bar_pos_y", Option),
            ("bar_width", Numeric),
            ("effect_cls", Object),
            ("effect_x", Object),
            ("effect_y", Object),
            ("viewport_size", List),
        ],
    ),
    widget(
        "ModalView",
        Some("AnchorLayout"),
        &[
            ("auto_dismiss", Boolean),
            ("attach_to", Object),
            ("background_color", Color),
            ("background", String),
            ("border", List),
            ("overlay_color", Color),
        ],
    ),
    widget(
        "Popup",
        Some("ModalView"),
        &[
            ("title", String),
            ("title_size", Numeric),
            ("title_align", Option),
            ("title_font", String),
            ("title_color", Color),
            ("separator_color", Color),
            ("separator_height", Numeric),
            ("content", Object),
        ],
    ),
    widget(
        "Screen",
        Some("RelativeLayout"),
        &[
            ("name", String),
            ("manager", Object),
            ("transition_progress", Numeric),
            ("transition_state", Option),
        ],
    ),
    widget(
        "ScreenManager",
        Some("FloatLayout"),
        &[
            ("current", String),
            ("current_screen", Object),
            ("transition", Object),
            ("screens", List),
            ("screen_names", Alias),
        ],
    ),
    widget(
        "TabbedPanel",
        Some("GridLayout"),
        &[
            ("do_default_tab", Boolean),
            ("default_tab_text", String),
            ("default_tab", Alias),
            ("tab_pos", Option),
            ("tab_height", Numeric),
            ("tab_width", Numeric),
            ("background_color", Color),
            ("background_image", String),
            ("border", List),
        ],
    ),
    widget("TabbedPanelItem", Some("ToggleButton"), &[("content", Object)]),
    widget("RecycleView", Some("ScrollView"), &[("data", List), ("viewclass", Object), ("layout_manager", Object)]),
    widget("RecycleBoxLayout", Some("BoxLayout"), &[("default_size", ReferenceList), ("default_size_hint", ReferenceList)]),
    widget("RecycleGridLayout", Some("GridLayout"), &[("default_size", ReferenceList), ("default_size_hint", ReferenceList)]),
    widget("Video", Some("Image"), &[("state", Option), ("position", Numeric), ("duration", Numeric), ("volume", Numeric), ("eos", Option)]),
];

pub static CANVAS_INSTRUCTIONS: &[&str] = &[
    "Color",
    "Rectangle",
    "RoundedRectangle",
    "Ellipse",
    "Line",
    "SmoothLine",
    "Triangle",
    "Quad",
    "Point",
    "Mesh",
    "Bezier",
    "BorderImage",
    "PushMatrix",
    "PopMatrix",
    "Rotate",
    "Scale",
    "Translate",
    "MatrixInstruction",
    "StencilPush",
    "StencilPop",
    "StencilUse",
    "StencilUnUse",
    "ClearColor",
    "ClearBuffers",
    "BindTexture",
    "Callback",
];
