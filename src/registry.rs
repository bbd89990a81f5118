//! Cable registration and lookup
//!
//! Cables are selected by name at runtime.  The registry maps each name (and its aliases) to a
//! constructor; constructing a cable never touches hardware, that happens in `Cable::init`.
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::cable::Cable;

/// Builds a cable with its default configuration
pub type Constructor = fn() -> Box<dyn Cable>;

/// Information about a cable
pub struct CableInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
    pub constructor: Constructor,
}

impl CableInfo {
    fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

#[derive(Default)]
pub struct Registry {
    cables: Vec<CableInfo>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every cable compiled into this crate.  Cables that need caller-owned
    /// resources (like `Gpio`) are not listed; build those directly.
    #[allow(unused_mut)]
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "std")]
        {
            use crate::cable::{ft232r::Ft232r, mpsse::JtagKey, usbblaster::UsbBlaster};

            registry.register(CableInfo {
                name: "jtagkey",
                aliases: &["ft2232", "busblaster"],
                description: "FT2232 MPSSE adapters (description=<desc>,freq=<Hz>,port=<A|B>)",
                constructor: || Box::<JtagKey>::default(),
            });
            registry.register(CableInfo {
                name: "ft232r",
                aliases: &["ft232r_bitbang"],
                description: "FT232R synchronous bit-bang (description=<desc>,baud=<rate>,tck=<pin>,...)",
                constructor: || Box::new(Ft232r::default()),
            });
            registry.register(CableInfo {
                name: "easyflash3",
                aliases: &[],
                description: "EasyFlash 3 cartridge JTAG port (FT232R bit-bang)",
                constructor: || Box::new(Ft232r::easyflash3()),
            });
            registry.register(CableInfo {
                name: "usbblaster",
                aliases: &["usb-blaster", "blaster"],
                description: "Altera USB-Blaster and clones (description=<desc>)",
                constructor: || Box::<UsbBlaster>::default(),
            });
        }

        registry
    }

    /// Add a cable.  A cable registered under an existing name replaces the old entry.
    pub fn register(&mut self, info: CableInfo) {
        self.cables.retain(|c| c.name != info.name);
        self.cables.push(info);
    }

    /// Look a cable up by name or alias
    pub fn find(&self, name: &str) -> Option<&CableInfo> {
        self.cables.iter().find(|c| c.matches(name))
    }

    pub fn cables(&self) -> &[CableInfo] {
        &self.cables
    }

    /// Generate help text listing all registered cables
    pub fn help(&self) -> String {
        if self.cables.is_empty() {
            return "No cables available (recompile with the std feature enabled)".into();
        }

        let mut help = String::from("Available cables:\n");
        for c in &self.cables {
            help.push_str(&format!("  {:12} - {}\n", c.name, c.description));
        }
        help
    }
}

/// Split a cable string into its name and `option=value` pairs.
///
/// The string can be just the name (`"jtagkey"`) or include options
/// (`"jtagkey:freq=1000000,port=B"`).
pub fn parse_cable_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();
        (name.trim(), options)
    } else {
        (s.trim(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCable;
    use alloc::vec;

    fn mock_info(name: &'static str) -> CableInfo {
        CableInfo {
            name,
            aliases: &["fake"],
            description: "recording cable",
            constructor: || Box::new(MockCable::default()),
        }
    }

    #[test]
    fn find_by_name_and_alias() {
        let mut registry = Registry::new();
        registry.register(mock_info("mock"));

        assert_eq!(registry.find("mock").map(|c| c.name), Some("mock"));
        assert_eq!(registry.find("fake").map(|c| c.name), Some("mock"));
        assert!(registry.find("jlink").is_none());
    }

    #[test]
    fn register_replaces_same_name() {
        let mut registry = Registry::new();
        registry.register(mock_info("mock"));
        registry.register(CableInfo { description: "second", ..mock_info("mock") });

        assert_eq!(registry.cables().len(), 1);
        assert_eq!(registry.cables()[0].description, "second");
    }

    #[test]
    fn help_lists_every_cable() {
        let mut registry = Registry::new();
        assert!(registry.help().starts_with("No cables"));

        registry.register(mock_info("mock"));
        assert!(registry.help().contains("mock"));
        assert!(registry.help().contains("recording cable"));
    }

    #[cfg(feature = "std")]
    #[test]
    fn builtin_knows_ftdi_cables() {
        let registry = Registry::builtin();
        for name in ["jtagkey", "ft2232", "ft232r", "easyflash3", "usbblaster"] {
            assert!(registry.find(name).is_some(), "{}", name);
        }
    }

    #[test]
    fn cable_string_with_options() {
        assert_eq!(parse_cable_string("jtagkey"), ("jtagkey", vec![]));
        assert_eq!(
            parse_cable_string("jtagkey:freq=1000000, port=B"),
            ("jtagkey", vec![("freq", "1000000"), ("port", "B")])
        );
    }
}
