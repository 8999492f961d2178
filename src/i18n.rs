/*
Simple i18n helper for the backend.

This module provides:
- A tiny embedded translations store for EN/PL (compile-time embedded JSON).
- A simple `tr` function to lookup translations by key + optional params.
- A `t` convenience wrapper using the default language (DEFAULT_LANG).

Usage:
    use crate::i18n;
    let msg = i18n::t("not_found.share");
    let msg_with = i18n::t_with("not_found.user_id", &[("id", "42")]);

Notes:
- Placeholders in translation strings use single-brace format: `{name}`.
- API responses use the default language (`en`). Outgoing emails use the
  language configured in `MAIL_LANG`. If a key is missing for the requested
  language, the default language is used.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "en";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();

const EN_JSON: &str = r#"
{
  "not_found.user": "User not found",
  "not_found.apartment": "Apartment not found",
  "not_found.share": "Share not found",
  "not_found.invoice_info": "Invoice info not found",
  "not_found.user_or_apartment": "User or apartment not found",
  "not_found.user_id": "User not found: {id}",
  "not_found.apartment_id": "Apartment not found: {id}",
  "conflict.share_exists": "Share already exists for this user and apartment",
  "conflict.username_taken": "Username is already taken",
  "conflict.invoice_info_exists": "Invoice info already exists for this user",
  "validation.required": "This field is required",
  "validation.not_blank": "This value should not be blank",
  "validation.min_length": "This value is too short. It should have {min} characters or more",
  "validation.max_length": "This value is too long. It should have {max} characters or less",
  "validation.email": "This value is not a valid email address",
  "validation.phone": "Phone number must start with + and country code (e.g., +48123456789)",
  "validation.integer": "This value should be a positive integer",
  "validation.percentage": "This value should be a number between 0 and 100 with at most two decimal places",
  "validation.percentage_ceiling": "Total percentage cannot exceed 100%",
  "validation.array": "This value should be an array",
  "validation.object": "This value should be an object",
  "validation.string": "This value should be a string",
  "validation.numeric": "This value should be a valid number",
  "validation.boolean": "This value should be of type boolean",
  "validation.password_mismatch": "Password and confirm password do not match",
  "validation.image_format": "Invalid image format",
  "validation.image_type": "Invalid file type. Only JPEG, PNG and WebP are allowed.",
  "validation.image_data": "Invalid base64 image data",
  "validation.image_size": "File size too large. Maximum size is 500KB.",
  "validation.image_missing": "No image file provided",
  "validation.image_unreadable": "The file is not a readable image",
  "validation.page": "Page must be a positive integer",
  "auth.credentials_required": "username and password are required",
  "auth.invalid_credentials": "Invalid credentials",
  "auth.refresh_token_required": "refresh_token is required",
  "auth.invalid_refresh_token": "Invalid or expired refresh token",
  "share.deleted": "Share deleted successfully",
  "share.apartment_updated": "Apartment shares updated successfully",
  "share.user_updated": "User shares updated successfully",
  "user.created": "User created successfully",
  "user.updated": "User updated successfully",
  "user.deleted": "User deleted successfully",
  "apartment.created": "Apartment created successfully",
  "apartment.updated": "Apartment updated successfully",
  "apartment.deleted": "Apartment deleted successfully",
  "apartment.image_uploaded": "Image uploaded successfully",
  "invoice_info.deleted": "Invoice info deleted successfully",
  "password_reset.requested": "If the email exists in our system, you will receive a password reset link.",
  "password_reset.email_required": "Email is required",
  "password_reset.email_invalid": "Invalid email format",
  "password_reset.token_required": "Token is required",
  "password_reset.token_and_password_required": "Token and password are required",
  "password_reset.invalid_token": "Invalid or expired token",
  "password_reset.password_too_short": "Password must be at least 6 characters long",
  "password_reset.done": "Password has been reset successfully",
  "password_reset.send_failed": "Failed to send reset email. Please try again later.",
  "email.reset.subject": "Password reset - Extranet System",
  "email.reset.body": "Hello {name},\n\nWe received a request to reset your password. Open the link below to choose a new one:\n\n{url}\n\nThe link expires in {expires}. If you did not request a reset, you can ignore this message.",
  "email.reset_confirmation.subject": "Your password has been changed - Extranet System",
  "email.reset_confirmation.body": "Hello {name},\n\nYour password has been changed successfully. If this was not you, contact the administrator immediately.",
  "email.expires_minutes": "{minutes} minutes",
  "app.name": "Extranet System"
}
"#;

const PL_JSON: &str = r#"
{
  "not_found.user": "Nie znaleziono użytkownika",
  "not_found.apartment": "Nie znaleziono apartamentu",
  "not_found.share": "Nie znaleziono udziału",
  "not_found.invoice_info": "Nie znaleziono danych do faktury",
  "not_found.user_or_apartment": "Nie znaleziono użytkownika lub apartamentu",
  "not_found.user_id": "Nie znaleziono użytkownika: {id}",
  "not_found.apartment_id": "Nie znaleziono apartamentu: {id}",
  "conflict.share_exists": "Udział dla tego użytkownika i apartamentu już istnieje",
  "conflict.username_taken": "Nazwa użytkownika jest już zajęta",
  "validation.percentage_ceiling": "Łączny procent nie może przekroczyć 100%",
  "share.deleted": "Udział został usunięty",
  "password_reset.requested": "Jeśli adres e-mail istnieje w naszym systemie, otrzymasz link do resetu hasła.",
  "password_reset.invalid_token": "Nieprawidłowy lub wygasły token",
  "password_reset.done": "Hasło zostało zresetowane",
  "email.reset.subject": "Reset hasła - Extranet System",
  "email.reset.body": "Witaj {name},\n\nOtrzymaliśmy prośbę o reset hasła. Kliknij poniższy link, aby ustawić nowe hasło:\n\n{url}\n\nLink wygaśnie za {expires}. Jeśli to nie Ty prosiłeś o reset, zignoruj tę wiadomość.",
  "email.reset_confirmation.subject": "Hasło zostało zmienione - Extranet System",
  "email.reset_confirmation.body": "Witaj {name},\n\nTwoje hasło zostało pomyślnie zmienione. Jeśli to nie Ty, skontaktuj się niezwłocznie z administratorem.",
  "email.expires_minutes": "{minutes} minut",
  "app.name": "Extranet System"
}
"#;

/// Initialize translations map (lazy).
fn build_translations() -> HashMap<String, HashMap<String, String>> {
    let mut out: HashMap<String, HashMap<String, String>> = HashMap::new();

    // Parse EN
    let en_map: HashMap<String, String> = serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in i18n module: {}", e);
    });
    out.insert("en".to_string(), en_map);

    // Parse PL
    let pl_map: HashMap<String, String> = serde_json::from_str(PL_JSON).unwrap_or_else(|e| {
        panic!("failed to parse PL_JSON in i18n module: {}", e);
    });
    out.insert("pl".to_string(), pl_map);

    out
}

/// Returns the global translations map (lang -> (key -> message)).
fn translations() -> &'static HashMap<String, HashMap<String, String>> {
    TRANSLATIONS.get_or_init(build_translations)
}

/// Normalize a language tag into a short, lowercase code (e.g. "pl-PL" -> "pl").
pub fn normalize_language(lang: &str) -> String {
    lang.split('-').next().unwrap_or(lang).to_lowercase()
}

/// Returns true if the given language code is supported (e.g. "en", "pl").
pub fn is_supported_language(lang: &str) -> bool {
    translations().contains_key(lang)
}

/// Translate a key using an explicit language (or default if None).
///
/// Returns the translated and parameter-substituted string. If no translation is found,
/// returns the default language value or the key itself.
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let map = translations();

    let desired = lang.unwrap_or(DEFAULT_LANG);

    let val = map
        .get(desired)
        .and_then(|m| m.get(key))
        .cloned()
        .or_else(|| map.get(DEFAULT_LANG).and_then(|m| m.get(key)).cloned())
        // If still missing, return the key itself (useful in logs)
        .unwrap_or_else(|| key.to_string());

    if let Some(params) = params {
        let mut s = val;
        for (k, v) in params {
            s = s.replace(&format!("{{{}}}", k), v);
        }
        s
    } else {
        val
    }
}

/// Convenience wrapper: translate using default language (DEFAULT_LANG).
pub fn t(key: &str) -> String {
    tr(None, key, None)
}

/// Convenience wrapper with params (default language).
pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    tr(None, key, Some(params))
}
