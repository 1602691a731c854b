//! Import name → pip distribution name.
//!
//! Import inference only yields module names; a handful of popular
//! distributions install under a different import name. Unknown names map to
//! themselves.

/// Import alias → canonical pip name.
const PYTHON_ALIASES: &[(&str, &str)] = &[
    ("cv2", "opencv-python"),
    ("PIL", "pillow"),
    ("sklearn", "scikit-learn"),
    ("bs4", "beautifulsoup4"),
    ("yaml", "pyyaml"),
    ("dotenv", "python-dotenv"),
    ("jwt", "pyjwt"),
    ("skimage", "scikit-image"),
    ("dateutil", "python-dateutil"),
    ("attr", "attrs"),
    ("Crypto", "pycryptodome"),
    ("OpenSSL", "pyopenssl"),
    ("serial", "pyserial"),
    ("docx", "python-docx"),
    ("pptx", "python-pptx"),
    ("fitz", "pymupdf"),
];

/// The pip distribution that provides `module`.
pub fn pip_name_for_module(module: &str) -> String {
    PYTHON_ALIASES
        .iter()
        .find(|(alias, _)| *alias == module)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| module.to_string())
}
