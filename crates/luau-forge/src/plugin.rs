//! The Studio side of the relay.
//!
//! Studio cannot be pushed to, so a small listener script long-polls the
//! relay topic and turns every published script into a `Script` instance
//! under `ServerScriptService`.

const TEMPLATE: &str = r#"-- Luau Forge connector
--
-- 1. In Roblox Studio, open Game Settings > Security and turn on
--    "Allow HTTP Requests".
-- 2. Add a new Script to ServerScriptService.
-- 3. Paste this code into it and run the game.
--
-- Scripts sent from Luau Forge show up in ServerScriptService.

local HttpService = game:GetService("HttpService")
local ServerScriptService = game:GetService("ServerScriptService")

-- Private: anyone who knows this URL can push scripts here.
local TOPIC_URL = "{{TOPIC_URL}}"

local function sanitizeName(title)
	local name = (title or ""):gsub("[^%w_ %-]", "")
	if #name == 0 then
		return "ForgeScript"
	end
	return name
end

local function applyScript(payload)
	local name = sanitizeName(payload.title)
	local source = payload.code or "-- empty script"

	local existing = ServerScriptService:FindFirstChild(name)
	if existing and existing:IsA("Script") then
		existing.Source = source
		print("[Luau Forge] Updated " .. name)
	else
		local script = Instance.new("Script")
		script.Name = name
		script.Source = source
		script.Parent = ServerScriptService
		print("[Luau Forge] Created " .. name)
	end
end

local function handleLine(line)
	local ok, event = pcall(HttpService.JSONDecode, HttpService, line)
	if not ok or event.event ~= "message" then
		return
	end
	local decoded, payload = pcall(HttpService.JSONDecode, HttpService, event.message)
	if decoded then
		task.spawn(applyScript, payload)
	end
end

local function listen()
	print("[Luau Forge] Listening for scripts...")
	while task.wait(1) do
		local ok, body = pcall(HttpService.GetAsync, HttpService, TOPIC_URL)
		if ok and body then
			for _, line in ipairs(body:split("\n")) do
				if #line > 0 then
					handleLine(line)
				end
			end
		else
			warn("[Luau Forge] Relay unreachable, retrying in 10s: " .. tostring(body))
			task.wait(10)
		end
	end
end

task.spawn(listen)
"#;

/// Returns the URL the connector long-polls for new scripts.
pub fn subscribe_url(relay_url: &str, topic: &str) -> String {
    format!("{}/{topic}/json", relay_url.trim_end_matches('/'))
}

/// Generates the connector script to paste into Studio.
pub fn connector_script(relay_url: &str, topic: &str) -> String {
    let url = subscribe_url(relay_url, topic);
    // Embedded in a double-quoted Luau string.
    let url = url.replace('\\', "\\\\").replace('"', "\\\"");
    TEMPLATE.replace("{{TOPIC_URL}}", &url)
}
