//! Display strings for the supported languages.
//!
//! Lookup falls back to English, then to `<key>`. Core logic never branches on the
//! language; only front-ends resolve keys when they render.

use phf::phf_map;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, Display, EnumIter)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    #[default]
    En,
    Es,
    De,
}

impl Language {
    /// Name of the language in the language itself, for the language switcher.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Español",
            Language::De => "Deutsch",
        }
    }

    fn table(self) -> &'static phf::Map<&'static str, &'static str> {
        match self {
            Language::En => &EN,
            Language::Es => &ES,
            Language::De => &DE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKey {
    WindowTitle,
    SerialPortLabel,
    FirmwareLabel,
    FlashAppCheckbox,
    RefreshButton,
    BrowseButton,
    LoadButton,
    LoadButtonLoading,
    EraseButton,
    EraseButtonErasing,
    CancelButton,
    PortsLoading,
    NoPortsFound,
    BrowseDialogTitle,
    StatusSelect,
    StatusReady,
    StatusStarting,
    StatusErasing,
    StatusErasingCritical,
    FlashingProgress,
    ErrorMissingParams,
    ErrorMissingPort,
    ErrorInvalidFile,
    ErrorLaunch,
    FlashSuccess,
    FlashErrorGeneric,
    EraseSuccess,
    EraseError,
    EraseConfirmTitle,
    EraseConfirmMessage,
    Cancelled,
    ShowLogsLabel,
    HideLogsLabel,
    ShellHelp,
    ShellUsageApp,
    ShellUsageLang,
    ShellUnknownCommand,
}

impl MessageKey {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Resolves `key` for `lang`.
pub fn text(lang: Language, key: MessageKey) -> String {
    let name = key.as_str();
    lang.table()
        .get(name)
        .or_else(|| EN.get(name))
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("<{}>", name))
}

/// Resolves the progress status line, substituting the percentage.
pub fn flashing_progress(lang: Language, percent: u8) -> String {
    text(lang, MessageKey::FlashingProgress).replace("{pct}", &percent.to_string())
}

/// Resolves the unknown command message, quoting what was typed.
pub fn unknown_command(lang: Language, command: &str) -> String {
    text(lang, MessageKey::ShellUnknownCommand).replace("{cmd}", command)
}

static EN: phf::Map<&'static str, &'static str> = phf_map! {
    "window_title" => "kodeOS Loader",
    "serial_port_label" => "Serial Port:",
    "firmware_label" => "Firmware (.bin):",
    "flash_app_checkbox" => "Flash Kode OS App (0x400000)",
    "refresh_button" => "Refresh",
    "browse_button" => "Browse",
    "load_button" => "Flash",
    "load_button_loading" => "Flashing...",
    "erase_button" => "Erase",
    "erase_button_erasing" => "Erasing...",
    "cancel_button" => "Cancel",
    "ports_loading" => "Loading ports...",
    "no_ports_found" => "No USB ports found",
    "browse_dialog_title" => "Select firmware .bin",
    "status_select" => "Select a serial port and a firmware file",
    "status_ready" => "Ready to flash",
    "status_starting" => "Starting flash...",
    "status_erasing" => "Erasing flash...",
    "status_erasing_critical" => "ERASING FLASH... DO NOT DISCONNECT THE DEVICE!",
    "flashing_progress" => "Flashing ({pct}%)...",
    "error_missing_params" => "Select serial port and firmware .bin file.",
    "error_missing_port" => "Please select a serial port.",
    "error_invalid_file" => "The firmware file cannot be read.",
    "error_launch" => "Could not start esptool. Is it installed?",
    "flash_success" => "Flash completed successfully.",
    "flash_error_generic" => "Error during flash. Check logs and retry.",
    "erase_success" => "Flash erased successfully.",
    "erase_error" => "Error during erase. Check logs.",
    "erase_confirm_title" => "Confirm Erase",
    "erase_confirm_message" => "This will ERASE THE ENTIRE FLASH on the device!\nThis cannot be undone.\n\nAre you sure?",
    "cancelled" => "Operation cancelled.",
    "show_logs_label" => "Show Logs",
    "hide_logs_label" => "Hide Logs",
    "shell_help" => "commands:
  ports | refresh       list serial ports
  port <n|device>       select a port
  file <path>           select the firmware .bin
  app on|off            flash the app partition (0x400000)
  flash                 start flashing
  erase                 erase the whole flash (asks for confirmation)
  cancel                stop the running operation
  ok                    dismiss the last result
  lang en|es|de         switch language
  status                show the current selection
  quit",
    "shell_usage_app" => "usage: app on|off",
    "shell_usage_lang" => "usage: lang en|es|de",
    "shell_unknown_command" => "unknown command '{cmd}', type 'help'",
};

static ES: phf::Map<&'static str, &'static str> = phf_map! {
    "window_title" => "Cargador kodeOS",
    "serial_port_label" => "Puerto Serial:",
    "firmware_label" => "Firmware (.bin):",
    "flash_app_checkbox" => "Flashear App Kode OS (0x400000)",
    "refresh_button" => "Refrescar",
    "browse_button" => "Buscar",
    "load_button" => "Flashear",
    "load_button_loading" => "Flasheando...",
    "erase_button" => "Borrar",
    "erase_button_erasing" => "Borrando...",
    "cancel_button" => "Cancelar",
    "ports_loading" => "Buscando puertos...",
    "no_ports_found" => "No se encontraron puertos USB",
    "browse_dialog_title" => "Seleccionar firmware .bin",
    "status_select" => "Seleccione un puerto serial y un archivo de firmware",
    "status_ready" => "Listo para flashear",
    "status_starting" => "Iniciando flasheo...",
    "status_erasing" => "Borrando flash...",
    "status_erasing_critical" => "BORRANDO FLASH... ¡NO DESCONECTE EL DISPOSITIVO!",
    "flashing_progress" => "Flasheando ({pct}%)...",
    "error_missing_params" => "Seleccione un puerto serial y un archivo .bin.",
    "error_missing_port" => "Por favor, seleccione un puerto serial.",
    "error_invalid_file" => "No se puede leer el archivo de firmware.",
    "error_launch" => "No se pudo iniciar esptool. ¿Está instalado?",
    "flash_success" => "Flasheo completado con éxito.",
    "flash_error_generic" => "Error durante el flasheo. Revise los logs e intente de nuevo.",
    "erase_success" => "Flash borrada con éxito.",
    "erase_error" => "Error durante el borrado. Revise los logs.",
    "erase_confirm_title" => "Confirmar Borrado",
    "erase_confirm_message" => "¡Esto BORRARÁ TODA LA FLASH del dispositivo!\nEsta acción no se puede deshacer.\n\n¿Está seguro?",
    "cancelled" => "Operación cancelada.",
    "show_logs_label" => "Mostrar Logs",
    "hide_logs_label" => "Ocultar Logs",
    "shell_help" => "comandos:
  ports | refresh       listar puertos seriales
  port <n|dispositivo>  seleccionar un puerto
  file <ruta>           seleccionar el firmware .bin
  app on|off            flashear la partición de la app (0x400000)
  flash                 iniciar el flasheo
  erase                 borrar toda la flash (pide confirmación)
  cancel                detener la operación en curso
  ok                    descartar el último resultado
  lang en|es|de         cambiar idioma
  status                mostrar la selección actual
  quit",
    "shell_usage_app" => "uso: app on|off",
    "shell_usage_lang" => "uso: lang en|es|de",
    "shell_unknown_command" => "comando desconocido '{cmd}', escriba 'help'",
};

static DE: phf::Map<&'static str, &'static str> = phf_map! {
    "window_title" => "kodeOS Loader",
    "serial_port_label" => "Serieller Port:",
    "firmware_label" => "Firmware (.bin):",
    "flash_app_checkbox" => "Kode OS App flashen (0x400000)",
    "refresh_button" => "Aktualisieren",
    "browse_button" => "Durchsuchen",
    "load_button" => "Flashen",
    "load_button_loading" => "Flashe...",
    "erase_button" => "Löschen",
    "erase_button_erasing" => "Lösche...",
    "cancel_button" => "Abbrechen",
    "ports_loading" => "Lade Ports...",
    "no_ports_found" => "Keine USB-Ports gefunden",
    "browse_dialog_title" => "Firmware .bin auswählen",
    "status_select" => "Seriellen Port und Firmware-Datei auswählen",
    "status_ready" => "Bereit zum Flashen",
    "status_starting" => "Starte Flashvorgang...",
    "status_erasing" => "Lösche Flash...",
    "status_erasing_critical" => "LÖSCHE FLASH... GERÄT NICHT TRENNEN!",
    "flashing_progress" => "Flashe ({pct}%)...",
    "error_missing_params" => "Seriellen Port und .bin-Firmware-Datei auswählen.",
    "error_missing_port" => "Bitte einen seriellen Port auswählen.",
    "error_invalid_file" => "Die Firmware-Datei kann nicht gelesen werden.",
    "error_launch" => "esptool konnte nicht gestartet werden. Ist es installiert?",
    "flash_success" => "Flashen erfolgreich abgeschlossen.",
    "flash_error_generic" => "Fehler beim Flashen. Logs prüfen und erneut versuchen.",
    "erase_success" => "Flash erfolgreich gelöscht.",
    "erase_error" => "Fehler beim Löschen. Logs prüfen.",
    "erase_confirm_title" => "Löschen bestätigen",
    "erase_confirm_message" => "Dies LÖSCHT DEN GESAMTEN FLASH des Geräts!\nDies kann nicht rückgängig gemacht werden.\n\nSind Sie sicher?",
    "cancelled" => "Vorgang abgebrochen.",
    "show_logs_label" => "Logs anzeigen",
    "hide_logs_label" => "Logs ausblenden",
    "shell_help" => "Befehle:
  ports | refresh       serielle Ports auflisten
  port <n|Gerät>        Port auswählen
  file <Pfad>           Firmware .bin auswählen
  app on|off            App-Partition flashen (0x400000)
  flash                 Flashvorgang starten
  erase                 gesamten Flash löschen (mit Bestätigung)
  cancel                laufenden Vorgang abbrechen
  ok                    letztes Ergebnis schließen
  lang en|es|de         Sprache wechseln
  status                aktuelle Auswahl anzeigen
  quit",
    "shell_usage_app" => "Verwendung: app on|off",
    "shell_usage_lang" => "Verwendung: lang en|es|de",
    "shell_unknown_command" => "Unbekannter Befehl '{cmd}', 'help' eingeben",
};
