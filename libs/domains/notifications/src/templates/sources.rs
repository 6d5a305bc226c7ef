//! Handlebars sources of the transactional emails.
//!
//! HTML sources are compiled into the escaping registry, subjects and plain
//! text into the non-escaping one. Available variables: `product`, `site`,
//! `support_url`, `ttl_minutes`, plus `code` or `reset_url` for the kinds
//! that carry them.

pub const FOOTER_HTML_PARTIAL: &str = r#"<div style='margin-top:60px; text-align:center; color:#9CA3AF; font-size:12px; border-top:1px solid #F3F4F6; padding-top:24px;'>© {{site}}. All rights reserved.</div>"#;

pub const SIGNATURE_TEXT_PARTIAL: &str = "Best regards,\nThe {{product}} Team\n";

// Verification code

pub const VERIFICATION_CODE_SUBJECT_TEMPLATE: &str = "{{product}} - Verification Code";

pub const VERIFICATION_CODE_TEXT_TEMPLATE: &str = r#"Hi!

Your verification code is: {{code}}

Enter this code to verify your email address.

Important: This code is valid for {{ttl_minutes}} minutes and can only be used once.

If you did not request this code, you can safely ignore this email.

{{> signature}}"#;

pub const VERIFICATION_CODE_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang='en'>
<head>
  <meta charset='UTF-8'>
  <meta name='viewport' content='width=device-width, initial-scale=1.0'>
  <title>Verify your email</title>
</head>
<body style='margin:0; padding:32px; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background-color:#FFFFFF; color:#000000; line-height:1.5;'>
  <div style='max-width:600px; margin:0 auto; background:#FFFFFF; padding:40px;'>
    <h1 style='font-size:32px; font-weight:600; color:#4F46E5; text-align:center; margin:0 0 40px 0;'>Verify your email</h1>
    <p style='margin:0 0 20px 0; font-size:16px;'>Hi!</p>
    <p style='margin:0 0 20px 0; font-size:16px;'>Your verification code is:</p>
    <div style='margin:32px 0; padding:24px; background:#F8FAFC; border:1px solid #E2E8F0; border-radius:8px; text-align:center;'>
      <div style='font-size:36px; font-weight:bold; color:#4F46E5; letter-spacing:4px;'>{{code}}</div>
    </div>
    <p style='margin:0 0 20px 0; font-size:16px;'>Enter this code to verify your email address.</p>
    <div style='margin:24px 0; padding:16px; background:#FEF3C7; border-left:4px solid #F59E0B; border-radius:4px;'>
      <p style='margin:0; font-size:14px; color:#92400E;'><strong>Important:</strong> This code is valid for {{ttl_minutes}} minutes and can only be used once.</p>
    </div>
    <p style='margin:24px 0 0 0; font-size:14px; color:#6B7280;'>If you did not request this code, you can safely ignore this email.</p>
    {{> footer}}
  </div>
</body>
</html>
"#;

// Welcome

pub const WELCOME_SUBJECT_TEMPLATE: &str = "Welcome to {{product}}!";

pub const WELCOME_TEXT_TEMPLATE: &str = r#"Hi and welcome to {{product}}!

Your account is now activated.

If you have any questions, contact our support at {{support_url}}

{{> signature}}"#;

pub const WELCOME_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang='en'>
<head>
  <meta charset='UTF-8'>
  <meta name='viewport' content='width=device-width, initial-scale=1.0'>
  <title>Welcome to {{product}}!</title>
</head>
<body style='margin:0; padding:32px; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background-color:#FFFFFF; color:#000000; line-height:1.5;'>
  <div style='max-width:600px; margin:0 auto; background:#FFFFFF; padding:40px;'>
    <h1 style='font-size:32px; font-weight:600; color:#4F46E5; text-align:center; margin:0 0 40px 0;'>Welcome to {{product}}!</h1>
    <p style='margin:0 0 20px 0; font-size:16px;'>Hi and welcome!</p>
    <p style='margin:0 0 32px 0; font-size:16px;'>Your account is now activated.</p>
    <div style='text-align:center; margin:32px 0;'>
      <a href='{{support_url}}' style='display:inline-block; background-color:#4F46E5; color:#FFFFFF; padding:12px 32px; border-radius:8px; text-decoration:none; font-weight:600; font-size:16px;'>Contact support</a>
    </div>
    <p style='margin:24px 0 0 0; font-size:14px; color:#6B7280;'>If you have any questions, we're here to help.</p>
    {{> footer}}
  </div>
</body>
</html>
"#;

// Password reset

pub const PASSWORD_RESET_SUBJECT_TEMPLATE: &str = "{{product}} - Reset Password";

pub const PASSWORD_RESET_TEXT_TEMPLATE: &str = r#"You requested to reset your password for {{product}}.

To reset your password, click the link below:
{{reset_url}}

If you did not request a password reset, you can ignore this email.

{{> signature}}"#;

pub const PASSWORD_RESET_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang='en'>
<head>
  <meta charset='UTF-8'>
  <meta name='viewport' content='width=device-width, initial-scale=1.0'>
  <title>Reset password</title>
</head>
<body style='margin:0; padding:32px; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background-color:#FFFFFF; color:#000000; line-height:1.5;'>
  <div style='max-width:600px; margin:0 auto; background:#FFFFFF; padding:40px;'>
    <h1 style='font-size:32px; font-weight:600; color:#4F46E5; text-align:center; margin:0 0 40px 0;'>Reset your password</h1>
    <p style='margin:0 0 32px 0; font-size:16px;'>You requested to reset your password for {{product}}.</p>
    <div style='text-align:center; margin:32px 0;'>
      <a href='{{reset_url}}' style='display:inline-block; background-color:#4F46E5; color:#FFFFFF; padding:12px 32px; border-radius:8px; text-decoration:none; font-weight:600; font-size:16px;'>Reset Password</a>
    </div>
    <p style='margin:24px 0 0 0; font-size:14px; color:#6B7280;'>If the button does not work, copy this link into your browser:<br>{{reset_url}}</p>
    <p style='margin:24px 0 0 0; font-size:14px; color:#6B7280;'>If you did not request a password reset, you can ignore this email.</p>
    {{> footer}}
  </div>
</body>
</html>
"#;

// Account deleted

pub const ACCOUNT_DELETED_SUBJECT_TEMPLATE: &str = "{{product}} - Account Deleted";

pub const ACCOUNT_DELETED_TEXT_TEMPLATE: &str = r#"Your {{product}} account has been deleted.

If this was not you, please contact support immediately: {{support_url}}

{{> signature}}"#;

pub const ACCOUNT_DELETED_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang='en'>
<head>
  <meta charset='UTF-8'>
  <meta name='viewport' content='width=device-width, initial-scale=1.0'>
  <title>Account deleted</title>
</head>
<body style='margin:0; padding:32px; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background-color:#FFFFFF; color:#000000; line-height:1.5;'>
  <div style='max-width:600px; margin:0 auto; background:#FFFFFF; padding:40px;'>
    <h1 style='font-size:32px; font-weight:600; color:#DC2626; text-align:center; margin:0 0 40px 0;'>Account deleted</h1>
    <p style='margin:0 0 20px 0; font-size:16px;'>Your {{product}} account has been deleted.</p>
    <p style='margin:0 0 20px 0; font-size:16px;'>If this was not you, <a href='{{support_url}}' style='color:#4F46E5; text-decoration:none; font-weight:600;'>contact support</a> immediately.</p>
    {{> footer}}
  </div>
</body>
</html>
"#;
